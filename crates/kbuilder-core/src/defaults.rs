//! Built-in defaults for a fresh build configuration.
//!
//! Every new wizard session starts from these values, so a user can accept
//! each prompt with `default` and still end up with a dispatchable build.

use kbuilder_types::build::{BuildConfiguration, KsuMode};

pub const DEFAULT_COMPILER: &str = "Geopelia-Clang-20";
pub const DEFAULT_KERNEL_REPOSITORY_URL: &str =
    "https://github.com/TelegramAt25/niigo_kernel_xiaomi_blossom";
pub const DEFAULT_KERNEL_BRANCH: &str = "yoka";
pub const DEFAULT_CONTAINER_IMAGE: &str = "fedora:40";

/// Return the default build configuration.
///
/// | Field      | Default                                                    |
/// |------------|------------------------------------------------------------|
/// | compiler   | Geopelia-Clang-20                                          |
/// | repository | https://github.com/TelegramAt25/niigo_kernel_xiaomi_blossom |
/// | branch     | yoka                                                       |
/// | container  | fedora:40                                                  |
/// | notes      | (empty)                                                    |
/// | KernelSU   | none                                                       |
pub fn defaults() -> BuildConfiguration {
    BuildConfiguration {
        compiler: DEFAULT_COMPILER.to_string(),
        kernel_repository_url: DEFAULT_KERNEL_REPOSITORY_URL.to_string(),
        kernel_branch: DEFAULT_KERNEL_BRANCH.to_string(),
        container_image: DEFAULT_CONTAINER_IMAGE.to_string(),
        notes: String::new(),
        kernel_su_mode: KsuMode::None,
    }
}
