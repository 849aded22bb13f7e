//! Temperature services published through the IOHID event system
//!
//! Apple Silicon exposes its die, NAND and battery gauges as vendor HID
//! temperature services (`PMU tdie1`, `NAND CH0 temp`, ...). Readings are
//! keyed by the service's `Product` name.

use crate::provider::{SensorProvider, SensorReadings};

/// Apple vendor usage page
pub const HID_PAGE_APPLE_VENDOR: i32 = 0xff00;
/// Temperature sensor usage within the vendor page
pub const HID_USAGE_TEMPERATURE_SENSOR: i32 = 5;
pub const HID_EVENT_TYPE_TEMPERATURE: i64 = 15;

/// Values at or below freezing or above 150 °C come from idle or broken
/// sensors and are dropped.
pub fn is_plausible(celsius: f64) -> bool {
    celsius.is_finite() && celsius > 0.0 && celsius <= 150.0
}

pub struct IoHidSensorSource {
    #[cfg(target_os = "macos")]
    client: platform::Client,
}

impl IoHidSensorSource {
    #[cfg(target_os = "macos")]
    pub fn open() -> Option<Self> {
        platform::Client::create().map(|client| Self { client })
    }

    #[cfg(not(target_os = "macos"))]
    pub fn open() -> Option<Self> {
        None
    }
}

impl SensorProvider for IoHidSensorSource {
    fn name(&self) -> &'static str {
        "iohid"
    }

    #[cfg(target_os = "macos")]
    fn read(&self) -> Option<SensorReadings> {
        let readings: SensorReadings =
            self.client.read_temperatures().into_iter().filter(|(_, value)| is_plausible(*value)).collect();
        (!readings.is_empty()).then_some(readings)
    }

    #[cfg(not(target_os = "macos"))]
    fn read(&self) -> Option<SensorReadings> {
        None
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use std::ffi::{c_void, CStr};
    use std::os::raw::c_char;

    use super::{HID_EVENT_TYPE_TEMPERATURE, HID_PAGE_APPLE_VENDOR, HID_USAGE_TEMPERATURE_SENSOR};

    type CFTypeRef = *const c_void;
    type CFIndex = isize;

    const CF_STRING_ENCODING_UTF8: u32 = 0x0800_0100;
    const CF_NUMBER_SINT32_TYPE: CFIndex = 3;

    #[repr(C)]
    struct CFDictionaryCallBacks {
        _private: [u8; 0],
    }

    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        static kCFTypeDictionaryKeyCallBacks: CFDictionaryCallBacks;
        static kCFTypeDictionaryValueCallBacks: CFDictionaryCallBacks;

        fn CFDictionaryCreateMutable(
            allocator: CFTypeRef,
            capacity: CFIndex,
            key_callbacks: *const CFDictionaryCallBacks,
            value_callbacks: *const CFDictionaryCallBacks,
        ) -> *mut c_void;
        fn CFDictionarySetValue(dict: *mut c_void, key: CFTypeRef, value: CFTypeRef);
        fn CFNumberCreate(allocator: CFTypeRef, kind: CFIndex, value: *const c_void) -> CFTypeRef;
        fn CFStringCreateWithCString(allocator: CFTypeRef, c_str: *const c_char, encoding: u32) -> CFTypeRef;
        fn CFStringGetCString(string: CFTypeRef, buffer: *mut c_char, size: CFIndex, encoding: u32) -> bool;
        fn CFArrayGetCount(array: CFTypeRef) -> CFIndex;
        fn CFArrayGetValueAtIndex(array: CFTypeRef, index: CFIndex) -> CFTypeRef;
        fn CFRelease(cf: CFTypeRef);
    }

    #[link(name = "IOKit", kind = "framework")]
    extern "C" {
        fn IOHIDEventSystemClientCreate(allocator: CFTypeRef) -> CFTypeRef;
        fn IOHIDEventSystemClientSetMatching(client: CFTypeRef, matching: CFTypeRef) -> i32;
        fn IOHIDEventSystemClientCopyServices(client: CFTypeRef) -> CFTypeRef;
        fn IOHIDServiceClientCopyProperty(service: CFTypeRef, key: CFTypeRef) -> CFTypeRef;
        fn IOHIDServiceClientCopyEvent(service: CFTypeRef, kind: i64, options: i32, timestamp: i64) -> CFTypeRef;
        fn IOHIDEventGetFloatValue(event: CFTypeRef, field: i32) -> f64;
    }

    /// Owned CoreFoundation reference
    struct Owned(CFTypeRef);

    impl Owned {
        fn new(ptr: CFTypeRef) -> Option<Self> {
            (!ptr.is_null()).then_some(Self(ptr))
        }
    }

    impl Drop for Owned {
        fn drop(&mut self) {
            unsafe { CFRelease(self.0) }
        }
    }

    fn cf_string(value: &'static [u8]) -> Option<Owned> {
        let value = CStr::from_bytes_with_nul(value).ok()?;
        Owned::new(unsafe { CFStringCreateWithCString(std::ptr::null(), value.as_ptr(), CF_STRING_ENCODING_UTF8) })
    }

    fn cf_number(value: i32) -> Option<Owned> {
        Owned::new(unsafe {
            CFNumberCreate(std::ptr::null(), CF_NUMBER_SINT32_TYPE, &value as *const i32 as *const c_void)
        })
    }

    fn to_string(string: CFTypeRef) -> Option<String> {
        let mut buffer = [0 as c_char; 256];
        let ok = unsafe { CFStringGetCString(string, buffer.as_mut_ptr(), buffer.len() as CFIndex, CF_STRING_ENCODING_UTF8) };
        if !ok {
            return None;
        }
        let name = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        Some(name.to_string_lossy().into_owned())
    }

    /// HID event system client matched to vendor temperature services
    pub(super) struct Client {
        client: Owned,
        product_key: Owned,
    }

    // The client is only used through CoreFoundation calls that are thread safe
    unsafe impl Send for Client {}
    unsafe impl Sync for Client {}

    impl Client {
        pub(super) fn create() -> Option<Self> {
            let client = Owned::new(unsafe { IOHIDEventSystemClientCreate(std::ptr::null()) })?;

            let matching = Owned::new(unsafe {
                CFDictionaryCreateMutable(
                    std::ptr::null(),
                    0,
                    &kCFTypeDictionaryKeyCallBacks,
                    &kCFTypeDictionaryValueCallBacks,
                )
            })?;
            let page_key = cf_string(b"PrimaryUsagePage\0")?;
            let usage_key = cf_string(b"PrimaryUsage\0")?;
            let page = cf_number(HID_PAGE_APPLE_VENDOR)?;
            let usage = cf_number(HID_USAGE_TEMPERATURE_SENSOR)?;
            unsafe {
                CFDictionarySetValue(matching.0 as *mut c_void, page_key.0, page.0);
                CFDictionarySetValue(matching.0 as *mut c_void, usage_key.0, usage.0);
                IOHIDEventSystemClientSetMatching(client.0, matching.0);
            }

            let product_key = cf_string(b"Product\0")?;
            Some(Self { client, product_key })
        }

        pub(super) fn read_temperatures(&self) -> Vec<(String, f64)> {
            let Some(services) = Owned::new(unsafe { IOHIDEventSystemClientCopyServices(self.client.0) }) else {
                tracing::debug!("no HID temperature services");
                return Vec::new();
            };

            let count = unsafe { CFArrayGetCount(services.0) };
            (0..count)
                .filter_map(|i| {
                    let service = unsafe { CFArrayGetValueAtIndex(services.0, i) };
                    self.read_service(service)
                })
                .collect()
        }

        fn read_service(&self, service: CFTypeRef) -> Option<(String, f64)> {
            let name = Owned::new(unsafe { IOHIDServiceClientCopyProperty(service, self.product_key.0) })?;
            let name = to_string(name.0)?;

            let event =
                Owned::new(unsafe { IOHIDServiceClientCopyEvent(service, HID_EVENT_TYPE_TEMPERATURE, 0, 0) })?;
            let field = (HID_EVENT_TYPE_TEMPERATURE as i32) << 16;
            let value = unsafe { IOHIDEventGetFloatValue(event.0, field) };
            Some((name, value))
        }
    }
}
