//! `multipart/form-data` bodies.
//!
//! The whole body is already in memory, so parts are found by scanning for
//! the boundary delimiter rather than by streaming.

use crate::http::{find_bytes, UploadedFile};
use std::collections::HashMap;

/// Fields and files of a decoded form
#[derive(Debug, Default)]
pub struct Form {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

/// Extract the `boundary` parameter of a content type
pub fn boundary(content_type: &str) -> Option<String> {
    // ASCII lower-casing keeps byte offsets intact
    let pos = content_type.to_ascii_lowercase().find("boundary=")?;
    let value = &content_type[pos + "boundary=".len()..];
    let value = value.split(';').next().unwrap_or("").trim().trim_matches('"');

    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Split a body into its parts
pub fn parse(body: &[u8], boundary: &str) -> Form {
    let mut form = Form::default();
    let delimiter = format!("\r\n--{}", boundary);
    let delimiter = delimiter.as_bytes();

    // The first delimiter may open the body without a preceding CRLF
    let mut rest = match find_bytes(body, &delimiter[2..]) {
        Some(pos) => &body[pos + delimiter.len() - 2..],
        None => return form,
    };

    loop {
        // "--" right after a delimiter closes the body
        if rest.starts_with(b"--") {
            break;
        }
        let rest_of_part = rest.strip_prefix(b"\r\n").unwrap_or(rest);

        match find_bytes(rest_of_part, delimiter) {
            Some(pos) => {
                add_part(&mut form, &rest_of_part[..pos]);
                rest = &rest_of_part[pos + delimiter.len()..];
            }
            None => {
                let tail = rest_of_part.strip_suffix(b"\r\n").unwrap_or(rest_of_part);
                add_part(&mut form, tail);
                break;
            }
        }
    }

    form
}

fn add_part(form: &mut Form, part: &[u8]) {
    let (head, content) = match find_bytes(part, b"\r\n\r\n") {
        Some(pos) => (&part[..pos], &part[pos + 4..]),
        None => return,
    };

    let head = String::from_utf8_lossy(head);
    let mut name = None;
    let mut file_name = None;
    let mut content_type = String::new();

    for line in head.split("\r\n") {
        let (key, value) = match line.split_once(':') {
            Some(pair) => pair,
            None => continue,
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "content-disposition" => {
                for param in value.split(';').skip(1) {
                    if let Some((key, value)) = param.split_once('=') {
                        let value = value.trim().trim_matches('"').to_string();
                        match key.trim().to_ascii_lowercase().as_str() {
                            "name" => name = Some(value),
                            "filename" => file_name = Some(value),
                            _ => {}
                        }
                    }
                }
            }
            "content-type" => content_type = value.trim().to_string(),
            _ => {}
        }
    }

    let field = match name {
        Some(name) => name,
        None => return,
    };

    match file_name {
        Some(file_name) => form.files.push(UploadedFile {
            field,
            file_name,
            content_type,
            data: content.to_vec(),
        }),
        None => {
            form.fields
                .insert(field, String::from_utf8_lossy(content).into_owned());
        }
    }
}
