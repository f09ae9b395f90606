use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_PHOTOS: usize = 50;

/// Incoming report payload. Field names follow the form posted by the web
/// client; English aliases are accepted too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(rename = "titulo", alias = "title", default)]
    pub title: Option<String>,
    #[serde(rename = "local", alias = "location", default)]
    pub location: Option<String>,
    #[serde(
        rename = "sistema_ref",
        alias = "systemRef",
        alias = "system_ref",
        default
    )]
    pub system_ref: Option<String>,
    #[serde(rename = "data", alias = "date", default)]
    pub date: Option<String>,
    #[serde(rename = "sistema", alias = "issuer", default)]
    pub issuer: Option<String>,
    #[serde(rename = "fotos", alias = "photos", default)]
    pub photos: Vec<PhotoEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoEntry {
    /// Base64 image, optionally prefixed with a `data:` URI header.
    #[serde(rename = "imagem", alias = "image", default)]
    pub image: String,
    #[serde(rename = "observacao", alias = "caption", default)]
    pub caption: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Dados não fornecidos")]
    MissingData,
    #[error("Dados inválidos: {0}")]
    Malformed(String),
    #[error("Nenhuma foto fornecida")]
    NoPhotos,
    #[error("Máximo de {max} fotos por relatório")]
    TooManyPhotos { max: usize },
}

impl ReportRequest {
    /// Parses a request body. An empty body, `null` or `{}` counts as missing data.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ValidationError::MissingData);
        }
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|err| ValidationError::Malformed(err.to_string()))?;
        match &value {
            serde_json::Value::Null => return Err(ValidationError::MissingData),
            serde_json::Value::Object(map) if map.is_empty() => {
                return Err(ValidationError::MissingData);
            }
            serde_json::Value::Object(_) => {}
            _ => {
                return Err(ValidationError::Malformed(
                    "expected a JSON object".to_string(),
                ));
            }
        }
        serde_json::from_value(value).map_err(|err| ValidationError::Malformed(err.to_string()))
    }

    pub fn validate(&self, max_photos: usize) -> Result<(), ValidationError> {
        if self.photos.is_empty() {
            return Err(ValidationError::NoPhotos);
        }
        if self.photos.len() > max_photos {
            return Err(ValidationError::TooManyPhotos { max: max_photos });
        }
        Ok(())
    }

    /// Populated metadata fields as (label, value), in document order.
    pub fn metadata(&self) -> Vec<(&'static str, &str)> {
        [
            ("Local:", self.location.as_deref()),
            ("Sistema:", self.system_ref.as_deref()),
            ("Data:", self.date.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| (label, value))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photos(count: usize) -> Vec<PhotoEntry> {
        (0..count)
            .map(|_| PhotoEntry {
                image: "aGVsbG8=".to_string(),
                caption: None,
            })
            .collect()
    }

    #[test]
    fn parses_portuguese_field_names() {
        let body = br#"{
            "titulo": "Relatorio de Auditoria",
            "local": "Estacao Jose Bonifacio",
            "sistema_ref": "SA",
            "data": "12/01/2026",
            "sistema": "Trivia Trens",
            "fotos": [{"imagem": "data:image/png;base64,AAAA", "observacao": "Trinca"}]
        }"#;
        let request = ReportRequest::from_json(body).expect("parse");
        assert_eq!(request.title.as_deref(), Some("Relatorio de Auditoria"));
        assert_eq!(request.system_ref.as_deref(), Some("SA"));
        assert_eq!(request.issuer.as_deref(), Some("Trivia Trens"));
        assert_eq!(request.photos.len(), 1);
        assert_eq!(request.photos[0].caption.as_deref(), Some("Trinca"));
    }

    #[test]
    fn parses_english_aliases() {
        let body = br#"{
            "title": "Audit Report",
            "location": "Plant 4",
            "systemRef": "HV",
            "date": "2026-01-12",
            "issuer": "Ops",
            "photos": [{"image": "AAAA", "caption": "Valve"}]
        }"#;
        let request = ReportRequest::from_json(body).expect("parse");
        assert_eq!(request.title.as_deref(), Some("Audit Report"));
        assert_eq!(request.location.as_deref(), Some("Plant 4"));
        assert_eq!(request.system_ref.as_deref(), Some("HV"));
        assert_eq!(request.photos[0].image, "AAAA");
    }

    #[test]
    fn empty_bodies_are_missing_data() {
        assert_eq!(
            ReportRequest::from_json(b"").unwrap_err(),
            ValidationError::MissingData
        );
        assert_eq!(
            ReportRequest::from_json(b"null").unwrap_err(),
            ValidationError::MissingData
        );
        assert_eq!(
            ReportRequest::from_json(b" {} ").unwrap_err(),
            ValidationError::MissingData
        );
        assert!(matches!(
            ReportRequest::from_json(b"[1,2]").unwrap_err(),
            ValidationError::Malformed(_)
        ));
        assert!(matches!(
            ReportRequest::from_json(b"{\"fotos\": 3}").unwrap_err(),
            ValidationError::Malformed(_)
        ));
    }

    #[test]
    fn photo_count_bounds() {
        let mut request = ReportRequest {
            title: Some("Audit Report".to_string()),
            ..ReportRequest::default()
        };
        assert_eq!(request.validate(MAX_PHOTOS), Err(ValidationError::NoPhotos));
        request.photos = photos(MAX_PHOTOS);
        assert_eq!(request.validate(MAX_PHOTOS), Ok(()));
        request.photos = photos(MAX_PHOTOS + 1);
        let err = request.validate(MAX_PHOTOS).unwrap_err();
        assert_eq!(err.to_string(), "Máximo de 50 fotos por relatório");
    }

    #[test]
    fn missing_photos_key_is_no_photos() {
        let request = ReportRequest::from_json(br#"{"titulo": "Audit Report"}"#).expect("parse");
        assert_eq!(
            request.validate(MAX_PHOTOS).unwrap_err().to_string(),
            "Nenhuma foto fornecida"
        );
    }

    #[test]
    fn metadata_skips_blank_fields() {
        let request = ReportRequest {
            location: Some("Plant 4".to_string()),
            system_ref: Some(" ".to_string()),
            date: Some("12/01/2026".to_string()),
            ..ReportRequest::default()
        };
        assert_eq!(
            request.metadata(),
            vec![("Local:", "Plant 4"), ("Data:", "12/01/2026")]
        );
    }
}
