use js_sys::Reflect;
use thiserror::Error;
use wasm_bindgen::JsValue;

/// Camera and decode-loop failures surfaced to the UI.
///
/// The `Display` text is what the error overlay shows; the raw platform
/// error name/message never reaches the user directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Доступ к камере запрещен. Пожалуйста, разрешите доступ в настройках браузера.")]
    PermissionDenied,
    #[error("Камера не найдена на устройстве.")]
    DeviceNotFound,
    #[error("Камера занята другим приложением.")]
    DeviceBusy,
    #[error("Ваш браузер не поддерживает доступ к камере")]
    UnsupportedBrowser,
    #[error("{0}")]
    Unknown(String),
}

const FALLBACK_MESSAGE: &str = "Неизвестная ошибка при доступе к камере";

impl CameraError {
    /// Map a rejected camera-API promise value into the taxonomy.
    ///
    /// getUserMedia rejects with a DOMException; reading `name`/`message`
    /// through `Reflect` works for those as well as plain `Error` objects.
    pub fn from_js(value: &JsValue) -> Self {
        let name = Reflect::get(value, &JsValue::from_str("name"))
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        let message = Reflect::get(value, &JsValue::from_str("message"))
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        Self::classify(&name, &message)
    }

    /// Name-based classification of a platform failure.
    pub fn classify(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => Self::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" => Self::DeviceNotFound,
            "NotReadableError" | "TrackStartError" => Self::DeviceBusy,
            _ if message.is_empty() => Self::Unknown(FALLBACK_MESSAGE.to_string()),
            _ => Self::Unknown(message.to_string()),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// Failures of the product lookup client.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{0}")]
    InvalidBarcode(&'static str),
    #[error("{message}")]
    Api { code: String, message: String },
    #[error("Ошибка сети при загрузке товара: {0}")]
    Transport(#[from] gloo::net::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_map_by_name() {
        assert_eq!(
            CameraError::classify("NotAllowedError", "Permission denied"),
            CameraError::PermissionDenied
        );
        assert_eq!(
            CameraError::classify("PermissionDeniedError", ""),
            CameraError::PermissionDenied
        );
    }

    #[test]
    fn device_errors_map_by_name() {
        assert_eq!(
            CameraError::classify("NotFoundError", ""),
            CameraError::DeviceNotFound
        );
        assert_eq!(
            CameraError::classify("DevicesNotFoundError", ""),
            CameraError::DeviceNotFound
        );
        assert_eq!(
            CameraError::classify("NotReadableError", ""),
            CameraError::DeviceBusy
        );
        assert_eq!(
            CameraError::classify("TrackStartError", ""),
            CameraError::DeviceBusy
        );
    }

    #[test]
    fn unrecognized_names_keep_the_platform_message() {
        assert_eq!(
            CameraError::classify("AbortError", "The operation was aborted"),
            CameraError::Unknown("The operation was aborted".to_string())
        );
    }

    #[test]
    fn unrecognized_names_without_message_use_the_fallback() {
        assert_eq!(
            CameraError::classify("", ""),
            CameraError::Unknown(FALLBACK_MESSAGE.to_string())
        );
    }

    #[test]
    fn permission_message_matches_the_ui_copy() {
        assert_eq!(
            CameraError::PermissionDenied.to_string(),
            "Доступ к камере запрещен. Пожалуйста, разрешите доступ в настройках браузера."
        );
    }

    #[test]
    fn device_messages_match_the_ui_copy() {
        assert_eq!(
            CameraError::DeviceNotFound.to_string(),
            "Камера не найдена на устройстве."
        );
        assert_eq!(
            CameraError::DeviceBusy.to_string(),
            "Камера занята другим приложением."
        );
        assert_eq!(
            CameraError::UnsupportedBrowser.to_string(),
            "Ваш браузер не поддерживает доступ к камере"
        );
    }

    #[test]
    fn only_permission_denied_reports_as_permission_class() {
        assert!(CameraError::PermissionDenied.is_permission_denied());
        assert!(!CameraError::DeviceBusy.is_permission_denied());
        assert!(!CameraError::Unknown("x".into()).is_permission_denied());
    }
}
