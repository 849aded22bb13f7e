//! Identity of the machine the pipeline runs on

/// Model, OS version and architecture, computed once per process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Hardware model identifier such as `Mac14,2`
    pub model_identifier: String,
    /// Dotted OS product version such as `14.4.1`
    pub os_version: String,
    pub is_apple_silicon: bool,
}

impl DeviceProfile {
    pub fn new(model_identifier: impl Into<String>, os_version: impl Into<String>, is_apple_silicon: bool) -> Self {
        Self { model_identifier: model_identifier.into(), os_version: os_version.into(), is_apple_silicon }
    }

    /// Query the running machine.
    ///
    /// Values that cannot be read fall back to `"unknown"` / `"0"`, which
    /// match no catalog entry and leave the pipeline in passthrough mode.
    pub fn detect() -> Self {
        let profile = Self {
            model_identifier: platform::model_identifier().unwrap_or_else(|| "unknown".to_string()),
            os_version: platform::os_version().unwrap_or_else(|| "0".to_string()),
            is_apple_silicon: platform::is_apple_silicon(),
        };
        tracing::info!(
            model = %profile.model_identifier,
            os = %profile.os_version,
            apple_silicon = profile.is_apple_silicon,
            "detected device"
        );
        profile
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use std::ffi::CString;
    use std::ptr;

    use libc::sysctlbyname;

    fn sysctl_string(name: &str) -> Option<String> {
        let name = CString::new(name).ok()?;
        let mut size: libc::size_t = 0;
        let result = unsafe { sysctlbyname(name.as_ptr(), ptr::null_mut(), &mut size, ptr::null_mut(), 0) };
        if result != 0 || size == 0 {
            return None;
        }

        let mut buffer = vec![0u8; size];
        let result =
            unsafe { sysctlbyname(name.as_ptr(), buffer.as_mut_ptr() as *mut _, &mut size, ptr::null_mut(), 0) };
        if result != 0 {
            return None;
        }

        let value = String::from_utf8_lossy(&buffer[..size]).trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string();
        (!value.is_empty()).then_some(value)
    }

    fn sysctl_i32(name: &str) -> Option<i32> {
        let name = CString::new(name).ok()?;
        let mut value: i32 = 0;
        let mut size = std::mem::size_of::<i32>();
        let result = unsafe {
            sysctlbyname(name.as_ptr(), &mut value as *mut i32 as *mut _, &mut size, ptr::null_mut(), 0)
        };
        (result == 0).then_some(value)
    }

    pub(super) fn model_identifier() -> Option<String> {
        sysctl_string("hw.model")
    }

    pub(super) fn os_version() -> Option<String> {
        sysctl_string("kern.osproductversion")
    }

    pub(super) fn is_apple_silicon() -> bool {
        // Also true for x86_64 binaries running under Rosetta
        sysctl_i32("hw.optional.arm64") == Some(1) || cfg!(target_arch = "aarch64")
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    pub(super) fn model_identifier() -> Option<String> {
        None
    }

    pub(super) fn os_version() -> Option<String> {
        None
    }

    pub(super) fn is_apple_silicon() -> bool {
        false
    }
}
