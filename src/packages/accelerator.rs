//! Core accelerator runtime (torch) install plan.

use crate::config::{AcceleratorSettings, DEFAULT_TORCH_INDEX_URL};
use crate::environment::HostPlatform;

/// Snippet that exits 0 only when the CUDA runtime is usable.
pub const CUDA_PROBE: &str = "import torch; assert torch.cuda.is_available()";

const IPEX_INDEX_URL: &str = "https://pytorch-extension.intel.com/release-whl/stable/xpu/us/";

const IPEX_WINDOWS_WHEELS: &str = "https://github.com/Nuullll/intel-extension-for-pytorch/releases/download/v2.0.110%2Bxpu-master%2Bdll-bundle";

/// What to run to install the accelerator runtime, and how to tell whether
/// it is already present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceleratorPlan {
    /// Arguments for `<python> -m ...`, starting with `pip`.
    pub module_args: Vec<String>,
    /// Packages that must all be installed for the install to be skipped.
    pub packages: Vec<String>,
}

impl AcceleratorPlan {
    /// Build the plan from settings.
    ///
    /// An explicit command wins over everything. It is split on whitespace;
    /// quoting is not supported.
    pub fn from_settings(settings: &AcceleratorSettings, platform: HostPlatform) -> Self {
        let module_args = match &settings.command {
            Some(command) => command.split_whitespace().map(str::to_string).collect(),
            None if settings.use_ipex => ipex_args(settings, platform),
            None => {
                let index = settings
                    .index_url
                    .as_deref()
                    .unwrap_or(DEFAULT_TORCH_INDEX_URL);
                owned(&[
                    "pip",
                    "install",
                    "torch==2.3.1",
                    "torchvision==0.18.1",
                    "--extra-index-url",
                    index,
                ])
            }
        };

        Self {
            module_args,
            packages: vec!["torch".to_string(), "torchvision".to_string()],
        }
    }
}

fn ipex_args(settings: &AcceleratorSettings, platform: HostPlatform) -> Vec<String> {
    if platform.is_windows() {
        let mut args = owned(&["pip", "install"]);
        for wheel in [
            "torch-2.0.0a0+gite9ebda2-cp310-cp310-win_amd64.whl",
            "torchvision-0.15.2a0+fa99a53-cp310-cp310-win_amd64.whl",
            "intel_extension_for_pytorch-2.0.110+gitc6ea20b-cp310-cp310-win_amd64.whl",
        ] {
            args.push(format!("{IPEX_WINDOWS_WHEELS}/{wheel}"));
        }
        args
    } else {
        let index = settings.index_url.as_deref().unwrap_or(IPEX_INDEX_URL);
        owned(&[
            "pip",
            "install",
            "torch==2.0.0a0",
            "intel-extension-for-pytorch==2.0.110+gitba7f6c1",
            "--extra-index-url",
            index,
        ])
    }
}

fn owned(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
