//! Streaming `multipart/form-data` body
//!
//! Text fields are rendered up front; the file part is read straight from
//! disk while the request is sent. A body is single-use: build a new one for
//! every attempt.

use crate::upload::request::UploadRequest;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;
use uuid::Uuid;

/// A multipart body ready to be streamed
pub struct MultipartBody {
    boundary: String,
    preamble: Vec<u8>,
    file: File,
    file_len: u64,
    epilogue: Vec<u8>,
}

impl MultipartBody {
    /// Render `fields` in order, followed by the file part named `file_field`
    pub fn new(
        fields: &[(&str, &str)],
        file_field: &str,
        file_name: &str,
        file_path: &Path,
    ) -> io::Result<Self> {
        let boundary = format!("----pkgflow{}", Uuid::new_v4().simple());

        let mut preamble = Vec::new();
        for (name, value) in fields {
            append_form_field(&mut preamble, &boundary, name, value);
        }
        preamble.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        preamble.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                escape_quoted(file_field),
                escape_quoted(file_name)
            )
            .as_bytes(),
        );
        preamble.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");

        let epilogue = format!("\r\n--{}--\r\n", boundary).into_bytes();

        let file = File::open(file_path)?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            boundary,
            preamble,
            file,
            file_len,
            epilogue,
        })
    }

    /// Body for an upload: `org, repo, target, channel`, then `file` last
    pub fn for_request(request: &UploadRequest) -> io::Result<Self> {
        Self::new(
            &[
                ("org", request.org.as_str()),
                ("repo", request.repo.as_str()),
                ("target", request.target.as_str()),
                ("channel", request.channel.as_str()),
            ],
            "file",
            &request.file_name(),
            &request.file,
        )
    }

    /// `Content-Type` header value
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact body length in bytes
    pub fn content_length(&self) -> u64 {
        self.preamble.len() as u64 + self.file_len + self.epilogue.len() as u64
    }

    /// Consume the body into a reader producing the encoded bytes
    pub fn into_reader(self) -> impl Read + Send {
        Cursor::new(self.preamble)
            .chain(self.file.take(self.file_len))
            .chain(Cursor::new(self.epilogue))
    }
}

fn append_form_field(body: &mut Vec<u8>, boundary: &str, name: &str, value: &str) {
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
            escape_quoted(name)
        )
        .as_bytes(),
    );
    body.extend_from_slice(value.as_bytes());
    body.extend_from_slice(b"\r\n");
}

/// Quoted-string escaping for header parameters
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
