//! Dynamsoft Label Recognizer backend
//!
//! Raw bindings to the closed-source `DynamsoftLabelRecognizer` runtime and
//! the RAII wrapper implementing [`RecognitionEngine`] over them. Linked
//! only when the `vendor` feature is enabled; the runtime library and a
//! license are required at link and run time.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;
use std::ptr;

use tracing::debug;

use super::{EngineError, RecognitionEngine, TextLine, TextZone};
use crate::error::ScanError;
use crate::frame::{FrameBuffer, PixelFormat};

/// Recognition profile baked into the MRZ template; not user-configurable
/// at this layer.
const RECOGNITION_PROFILE: &CStr = c"locr";

/// Status the wrapper itself reports when an input cannot cross the C
/// boundary (interior NUL in a path, key, or template).
const STATUS_BAD_INPUT: c_int = -1;

const ERROR_BUFFER_LEN: usize = 512;

mod ffi {
    use super::{c_char, c_int, c_void};

    // Pixel format selectors from the vendor header.
    pub const IPF_GRAYSCALED: c_int = 2;
    pub const IPF_RGB_888: c_int = 6;
    pub const IPF_ARGB_8888: c_int = 7;

    #[repr(C)]
    pub struct DmPoint {
        pub x: c_int,
        pub y: c_int,
    }

    #[repr(C)]
    pub struct Quadrilateral {
        pub points: [DmPoint; 4],
    }

    #[repr(C)]
    pub struct ImageData {
        pub bytes_length: c_int,
        pub bytes: *const u8,
        pub width: c_int,
        pub height: c_int,
        pub stride: c_int,
        pub format: c_int,
    }

    #[repr(C)]
    pub struct DlrLineResult {
        pub line_specification_name: *const c_char,
        pub text: *const c_char,
        pub character_model_name: *const c_char,
        pub location: Quadrilateral,
        pub confidence: c_int,
        pub character_results_count: c_int,
        pub character_results: *mut *mut c_void,
        pub reserved: [c_char; 64],
    }

    #[repr(C)]
    pub struct DlrResult {
        pub reference_region_name: *const c_char,
        pub text_area_name: *const c_char,
        pub location: Quadrilateral,
        pub confidence: c_int,
        pub line_results_count: c_int,
        pub line_results: *mut *mut DlrLineResult,
        pub page_number: c_int,
        pub reserved: [c_char; 60],
    }

    #[repr(C)]
    pub struct DlrResultArray {
        pub results: *mut *mut DlrResult,
        pub results_count: c_int,
    }

    #[link(name = "DynamsoftLabelRecognizer")]
    extern "C" {
        pub fn DLR_CreateInstance() -> *mut c_void;
        pub fn DLR_DestroyInstance(handle: *mut c_void);
        pub fn DLR_InitLicense(
            license: *const c_char,
            error_buffer: *mut c_char,
            error_buffer_len: c_int,
        ) -> c_int;
        pub fn DLR_RecognizeByFile(
            handle: *mut c_void,
            file_name: *const c_char,
            template_name: *const c_char,
        ) -> c_int;
        pub fn DLR_RecognizeByBuffer(
            handle: *mut c_void,
            image_data: *const ImageData,
            template_name: *const c_char,
        ) -> c_int;
        pub fn DLR_GetAllResults(handle: *mut c_void, results: *mut *mut DlrResultArray) -> c_int;
        pub fn DLR_FreeResults(results: *mut *mut DlrResultArray);
        pub fn DLR_AppendSettingsFromFile(
            handle: *mut c_void,
            file_path: *const c_char,
            error_buffer: *mut c_char,
            error_buffer_len: c_int,
        ) -> c_int;
        pub fn DLR_AppendSettingsFromString(
            handle: *mut c_void,
            content: *const c_char,
            error_buffer: *mut c_char,
            error_buffer_len: c_int,
        ) -> c_int;
        pub fn DLR_GetErrorString(error_code: c_int) -> *const c_char;
        pub fn DLR_GetVersion() -> *const c_char;
    }
}

/// Set the runtime license. Must succeed once per process before any
/// session is created.
pub fn init_license(key: &str) -> Result<(), ScanError> {
    let key = CString::new(key).map_err(|_| ScanError::Engine {
        status: STATUS_BAD_INPUT,
        message: "license key contains an interior NUL byte".to_string(),
    })?;

    let mut buffer = [0 as c_char; ERROR_BUFFER_LEN];
    let status =
        unsafe { ffi::DLR_InitLicense(key.as_ptr(), buffer.as_mut_ptr(), ERROR_BUFFER_LEN as c_int) };
    let message = buffer_to_string(&buffer);
    debug!("license initialization: {}", message);

    if status != 0 {
        return Err(ScanError::Engine { status, message });
    }
    Ok(())
}

/// Version string of the linked runtime.
pub fn runtime_version() -> String {
    let ptr = unsafe { ffi::DLR_GetVersion() };
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Owned engine handle; destroyed on drop.
pub struct DynamsoftEngine {
    handle: *mut c_void,
}

// The handle may move to the worker thread; the runtime only requires that
// calls on one handle never overlap, which the session's engine lock
// guarantees.
unsafe impl Send for DynamsoftEngine {}

impl DynamsoftEngine {
    /// Allocate a native engine instance.
    pub fn create() -> Result<Self, ScanError> {
        let handle = unsafe { ffi::DLR_CreateInstance() };
        if handle.is_null() {
            return Err(ScanError::EngineAllocation);
        }
        Ok(Self { handle })
    }

    fn status_error(&self, status: c_int) -> EngineError {
        EngineError {
            status,
            message: error_string(status),
        }
    }

    fn append_settings_raw(&mut self, content: &CStr, from_file: bool) -> Result<(), EngineError> {
        let mut buffer = [0 as c_char; ERROR_BUFFER_LEN];
        let status = unsafe {
            if from_file {
                ffi::DLR_AppendSettingsFromFile(
                    self.handle,
                    content.as_ptr(),
                    buffer.as_mut_ptr(),
                    ERROR_BUFFER_LEN as c_int,
                )
            } else {
                ffi::DLR_AppendSettingsFromString(
                    self.handle,
                    content.as_ptr(),
                    buffer.as_mut_ptr(),
                    ERROR_BUFFER_LEN as c_int,
                )
            }
        };

        let message = buffer_to_string(&buffer);
        debug!("append settings: {}", message);
        if status != 0 {
            return Err(EngineError { status, message });
        }
        Ok(())
    }
}

impl RecognitionEngine for DynamsoftEngine {
    fn recognize_file(&mut self, path: &Path) -> Result<(), EngineError> {
        let path = path_to_cstring(path)?;
        let status = unsafe {
            ffi::DLR_RecognizeByFile(self.handle, path.as_ptr(), RECOGNITION_PROFILE.as_ptr())
        };
        if status != 0 {
            return Err(self.status_error(status));
        }
        Ok(())
    }

    fn recognize_buffer(&mut self, frame: &FrameBuffer) -> Result<(), EngineError> {
        let data = ffi::ImageData {
            bytes_length: frame.byte_len() as c_int,
            bytes: frame.data().as_ptr(),
            width: frame.width() as c_int,
            height: frame.height() as c_int,
            stride: frame.stride() as c_int,
            format: match frame.format() {
                PixelFormat::Grayscale => ffi::IPF_GRAYSCALED,
                PixelFormat::Rgb => ffi::IPF_RGB_888,
                PixelFormat::Argb => ffi::IPF_ARGB_8888,
            },
        };

        let status = unsafe {
            ffi::DLR_RecognizeByBuffer(self.handle, &data, RECOGNITION_PROFILE.as_ptr())
        };
        if status != 0 {
            return Err(self.status_error(status));
        }
        Ok(())
    }

    fn take_results(&mut self) -> Option<Vec<TextZone>> {
        let mut array: *mut ffi::DlrResultArray = ptr::null_mut();
        unsafe { ffi::DLR_GetAllResults(self.handle, &mut array) };
        if array.is_null() {
            return None;
        }

        let zones = unsafe { convert_results(array) };
        unsafe { ffi::DLR_FreeResults(&mut array) };
        Some(zones)
    }

    fn append_settings_file(&mut self, path: &Path) -> Result<(), EngineError> {
        let path = path_to_cstring(path)?;
        self.append_settings_raw(&path, true)
    }

    fn append_settings(&mut self, content: &str) -> Result<(), EngineError> {
        let content = CString::new(content).map_err(|_| EngineError {
            status: STATUS_BAD_INPUT,
            message: "settings content contains an interior NUL byte".to_string(),
        })?;
        self.append_settings_raw(&content, false)
    }

    fn version(&self) -> String {
        runtime_version()
    }
}

impl Drop for DynamsoftEngine {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { ffi::DLR_DestroyInstance(self.handle) };
            self.handle = ptr::null_mut();
        }
    }
}

/// Walk the nested result array into owned zones.
///
/// Every pointer the runtime hands back is checked before dereference; the
/// array stays valid until `DLR_FreeResults`.
unsafe fn convert_results(array: *const ffi::DlrResultArray) -> Vec<TextZone> {
    let array = &*array;
    if array.results.is_null() || array.results_count <= 0 {
        return Vec::new();
    }

    let results = std::slice::from_raw_parts(array.results, array.results_count as usize);
    let mut zones = Vec::with_capacity(results.len());

    for &result in results {
        if result.is_null() {
            continue;
        }
        let result = &*result;

        let mut lines = Vec::new();
        if !result.line_results.is_null() && result.line_results_count > 0 {
            let line_ptrs =
                std::slice::from_raw_parts(result.line_results, result.line_results_count as usize);
            for &line in line_ptrs {
                if line.is_null() {
                    continue;
                }
                let line = &*line;
                let text = if line.text.is_null() {
                    String::new()
                } else {
                    CStr::from_ptr(line.text).to_string_lossy().into_owned()
                };

                let p = &line.location.points;
                lines.push(TextLine {
                    text,
                    confidence: line.confidence,
                    corners: [
                        (p[0].x, p[0].y),
                        (p[1].x, p[1].y),
                        (p[2].x, p[2].y),
                        (p[3].x, p[3].y),
                    ],
                });
            }
        }

        zones.push(TextZone { lines });
    }

    zones
}

fn error_string(status: c_int) -> String {
    let ptr = unsafe { ffi::DLR_GetErrorString(status) };
    if ptr.is_null() {
        return format!("unknown engine error {}", status);
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn path_to_cstring(path: &Path) -> Result<CString, EngineError> {
    CString::new(path.to_string_lossy().as_bytes()).map_err(|_| EngineError {
        status: STATUS_BAD_INPUT,
        message: "path contains an interior NUL byte".to_string(),
    })
}

fn buffer_to_string(buffer: &[c_char]) -> String {
    let bytes: Vec<u8> = buffer
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
