/// Multipart form reading
///
/// Product and seller-registration forms mix text fields with optional
/// file inputs. The whole form is buffered first; files are only written
/// to the upload directory once the text fields have been validated.

use crate::error::{ApiError, ApiResult};
use axum::extract::Multipart;
use bytes::Bytes;
use std::collections::HashMap;
use storefront_shared::storage::UploadStore;

/// A file input with its client-side name
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub data: Bytes,
}

/// Buffered multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FilePart>,
}

impl MultipartForm {
    /// Drains the request body
    ///
    /// A file input left empty in the browser arrives with an empty
    /// filename and no bytes; it's treated as absent.
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await?;
                    if !file_name.is_empty() && !data.is_empty() {
                        form.files.insert(name, FilePart { file_name, data });
                    }
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed text field; blank counts as missing
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, name: &str) -> ApiResult<&str> {
        self.text(name)
            .ok_or_else(|| ApiError::invalid(name, format!("{} is required", name)))
    }

    /// Required field parsed into a number
    pub fn number<T: std::str::FromStr>(&self, name: &str) -> ApiResult<T> {
        self.required(name)?
            .parse()
            .map_err(|_| ApiError::invalid(name, format!("{} must be a number", name)))
    }

    /// Optional field parsed into a number; blank means `None`
    pub fn optional_number<T: std::str::FromStr>(&self, name: &str) -> ApiResult<Option<T>> {
        self.text(name)
            .map(|raw| {
                raw.parse()
                    .map_err(|_| ApiError::invalid(name, format!("{} must be a number", name)))
            })
            .transpose()
    }

    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.get(name)
    }

    /// Stores the named file if it was uploaded and returns its stored name
    pub async fn save_file(&self, store: &UploadStore, name: &str) -> ApiResult<Option<String>> {
        match self.file(name) {
            Some(part) => Ok(Some(store.save(&part.file_name, part.data.clone()).await?)),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }
}
