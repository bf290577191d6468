use serde::{Deserialize, Serialize};

/// Which storage backend a device's files are written to, resolved from
/// its DeviceModel name (and, for the remote kinds, further disambiguated
/// by an explicit `protocol` device parameter — the retrieved corpus shows
/// no plain-FTP precedent, so this distinction is this core's own addition;
/// see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Local,
    Ftp,
    Sftp,
}

impl StorageBackendKind {
    pub fn resolve(model_name: &str, parameters: &serde_json::Value) -> Self {
        if model_name.eq_ignore_ascii_case("local storage") {
            return Self::Local;
        }
        match parameters
            .get("protocol")
            .and_then(|v| v.as_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("ftp") => Self::Ftp,
            _ => Self::Sftp,
        }
    }
}

/// The folder an uploaded artifact is classified into by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFolder {
    Images,
    Pdfs,
    Others,
}

impl StorageFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Pdfs => "pdfs",
            Self::Others => "others",
        }
    }

    pub fn classify(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" => Self::Images,
            "pdf" => Self::Pdfs,
            _ => Self::Others,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_image_extensions() {
        for ext in ["jpg", "JPEG", "png", "gif", "bmp", "webp"] {
            assert_eq!(StorageFolder::classify(ext), StorageFolder::Images);
        }
    }

    #[test]
    fn classifies_pdf_and_falls_back_to_others() {
        assert_eq!(StorageFolder::classify("pdf"), StorageFolder::Pdfs);
        assert_eq!(StorageFolder::classify("bin"), StorageFolder::Others);
    }

    #[test]
    fn resolve_picks_local_for_local_storage_model() {
        let kind = StorageBackendKind::resolve("Local Storage", &serde_json::json!({}));
        assert_eq!(kind, StorageBackendKind::Local);
    }

    #[test]
    fn resolve_picks_ftp_when_protocol_param_says_so() {
        let kind =
            StorageBackendKind::resolve("Remote Storage", &serde_json::json!({"protocol": "ftp"}));
        assert_eq!(kind, StorageBackendKind::Ftp);
    }

    #[test]
    fn resolve_defaults_remote_to_sftp() {
        let kind = StorageBackendKind::resolve("Remote Storage", &serde_json::json!({}));
        assert_eq!(kind, StorageBackendKind::Sftp);
    }
}
