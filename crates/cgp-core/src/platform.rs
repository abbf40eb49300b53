use crate::DeployError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "macos" | "darwin" => Some(Self::MacOs),
            "windows" | "win32" => Some(Self::Windows),
            _ => None,
        }
    }

    /// `cgp` on Unix, `cgp.exe` on Windows.
    pub fn exe_file_name(self, stem: &str) -> String {
        match self {
            Self::Windows => format!("{stem}.exe"),
            _ => stem.to_string(),
        }
    }
}

/// Architecture after normalization: `x86_64`/`amd64` and `aarch64`/`arm64`
/// collapse to one canonical token each, anything else passes through
/// lower-cased (and is necessarily unsupported).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Arm64,
    Other(String),
}

impl Arch {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" => Self::X86_64,
            "aarch64" | "arm64" => Self::Arm64,
            "" => Self::Other("unknown".to_string()),
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
            Self::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Resolve the target platform from the host, honoring explicit
    /// overrides (deterministic testing). An unrecognized OS override is an
    /// unsupported platform, not a parse error.
    pub fn detect(
        os_override: Option<&str>,
        arch_override: Option<&str>,
    ) -> Result<Self, DeployError> {
        let os_raw = os_override.unwrap_or(std::env::consts::OS);
        let arch_raw = arch_override.unwrap_or(std::env::consts::ARCH);
        let arch = Arch::normalize(arch_raw);

        let Some(os) = Os::parse(os_raw) else {
            return Err(DeployError::UnsupportedPlatform {
                os: os_raw.trim().to_ascii_lowercase(),
                arch: arch.as_str().to_string(),
            });
        };

        Ok(Self { os, arch })
    }

    /// The release asset published for this platform. The supported set is
    /// closed; everything else fails here, before any network access.
    pub fn release_asset_name(&self) -> Result<&'static str, DeployError> {
        match (self.os, &self.arch) {
            (Os::Linux, Arch::X86_64) => Ok("cgp-linux-x86_64.tar.gz"),
            (Os::Linux, Arch::Arm64) => Ok("cgp-linux-arm64.tar.gz"),
            (Os::MacOs, Arch::X86_64) => Ok("cgp-macos-x86_64.tar.gz"),
            (Os::MacOs, Arch::Arm64) => Ok("cgp-macos-arm64.tar.gz"),
            (Os::Windows, Arch::X86_64) => Ok("cgp-windows-x86_64.zip"),
            (os, arch) => Err(DeployError::UnsupportedPlatform {
                os: os.as_str().to_string(),
                arch: arch.as_str().to_string(),
            }),
        }
    }

    /// Path of the executable inside an extracted bundle, relative to the
    /// extraction root: `cgp/cgp` (`cgp\cgp.exe` on Windows).
    pub fn bundle_exe_rel_path(&self) -> std::path::PathBuf {
        std::path::Path::new(crate::TOOL_NAME).join(self.os.exe_file_name(crate::TOOL_NAME))
    }
}
