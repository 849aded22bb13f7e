//! AppleSMC user-client request layout and IOKit transport

/// Mirrors `SMCKeyData_vers_t`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SmcVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub reserved: u8,
    pub release: u16,
}

/// Mirrors `SMCKeyData_pLimitData_t`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SmcPLimitData {
    pub version: u16,
    pub length: u16,
    pub cpu_plimit: u32,
    pub gpu_plimit: u32,
    pub mem_plimit: u32,
}

/// Mirrors `SMCKeyData_keyInfo_t`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SmcKeyInfo {
    pub data_size: u32,
    /// Type tag as a native-endian FourCC
    pub data_type: u32,
    pub data_attributes: u8,
}

/// The 80-byte struct exchanged with the AppleSMC user client
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SmcKeyData {
    pub key: u32,
    pub vers: SmcVersion,
    pub p_limit_data: SmcPLimitData,
    pub key_info: SmcKeyInfo,
    pub result: u8,
    pub status: u8,
    /// Command selector
    pub data8: u8,
    pub data32: u32,
    pub bytes: [u8; 32],
}

#[cfg(target_os = "macos")]
pub use platform::IoKitSmcTransport;

#[cfg(target_os = "macos")]
mod platform {
    use std::ffi::c_void;
    use std::mem::size_of;
    use std::os::raw::c_char;

    use super::SmcKeyData;
    use crate::error::{Error, Result};
    use crate::sources::smc::SmcTransport;

    type KernReturn = i32;
    type MachPort = u32;
    type IoObject = MachPort;

    const KERN_SUCCESS: KernReturn = 0;
    const IO_MAIN_PORT_DEFAULT: MachPort = 0;

    #[link(name = "IOKit", kind = "framework")]
    extern "C" {
        static mach_task_self_: MachPort;

        fn IOServiceMatching(name: *const c_char) -> *mut c_void;
        fn IOServiceGetMatchingService(main_port: MachPort, matching: *mut c_void) -> IoObject;
        fn IOServiceOpen(service: IoObject, owning_task: MachPort, kind: u32, connect: *mut IoObject) -> KernReturn;
        fn IOServiceClose(connect: IoObject) -> KernReturn;
        fn IOObjectRelease(object: IoObject) -> KernReturn;
        fn IOConnectCallStructMethod(
            connection: IoObject,
            selector: u32,
            input: *const c_void,
            input_size: usize,
            output: *mut c_void,
            output_size: *mut usize,
        ) -> KernReturn;
    }

    /// Open connection to the AppleSMC service; closed on drop
    #[derive(Debug)]
    pub struct IoKitSmcTransport {
        connection: IoObject,
    }

    impl IoKitSmcTransport {
        pub fn open() -> Result<Self> {
            let service = unsafe {
                // IOServiceGetMatchingService consumes the matching dictionary
                let matching = IOServiceMatching(b"AppleSMC\0".as_ptr() as *const c_char);
                if matching.is_null() {
                    return Err(Error::system("IOServiceMatching returned null"));
                }
                IOServiceGetMatchingService(IO_MAIN_PORT_DEFAULT, matching)
            };
            if service == 0 {
                return Err(Error::not_available("AppleSMC service not found"));
            }
            scopeguard::defer! {
                unsafe { IOObjectRelease(service); }
            }

            let mut connection: IoObject = 0;
            let result = unsafe { IOServiceOpen(service, mach_task_self_, 0, &mut connection) };
            if result != KERN_SUCCESS || connection == 0 {
                return Err(Error::system(format!("IOServiceOpen failed: {result:#x}")));
            }
            Ok(Self { connection })
        }
    }

    impl SmcTransport for IoKitSmcTransport {
        fn call(&self, selector: u32, input: &SmcKeyData) -> Option<SmcKeyData> {
            let mut output = SmcKeyData::default();
            let mut output_size = size_of::<SmcKeyData>();
            let result = unsafe {
                IOConnectCallStructMethod(
                    self.connection,
                    selector,
                    input as *const SmcKeyData as *const c_void,
                    size_of::<SmcKeyData>(),
                    &mut output as *mut SmcKeyData as *mut c_void,
                    &mut output_size,
                )
            };
            (result == KERN_SUCCESS).then_some(output)
        }
    }

    impl Drop for IoKitSmcTransport {
        fn drop(&mut self) {
            unsafe {
                IOServiceClose(self.connection);
            }
        }
    }
}
