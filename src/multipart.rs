//! # Multipart Parser Module
//!
//! Parser minimale e binary-safe per `multipart/form-data` con un solo boundary
//! e struttura piatta (un file + campi di testo), quello che invia il form di upload.
//!
//! ## Responsabilità:
//! - Estrae il boundary dall'header `Content-Type`
//! - Divide il body in parti nominate (`MultipartPart`)
//! - Classifica ogni parte come file (ha `filename`) o campo di testo
//!
//! ## Algoritmo:
//! 1. Cerca `--<boundary>` e il terminatore `--<boundary>--`; errore se mancano
//! 2. Divide la regione intermedia sul separatore `\r\n--<boundary>`,
//!    incluso l'ultimo segmento dopo l'ultimo separatore
//! 3. Ogni segmento senza `\r\n\r\n` viene scartato in silenzio
//! 4. `name="…"` e `filename="…"` letti dall'header `Content-Disposition`;
//!    parti senza `name` scartate
//! 5. I dati dei file non vengono mai trimmati; i campi di testo sì
//!
//! Non è un parser MIME completo: niente multipart annidati, niente
//! `Content-Transfer-Encoding`, niente `filename*=`.

/// One named field or file segment extracted from a form body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    /// Present for file parts only
    pub filename: Option<String>,
    /// Trimmed UTF-8 text for field parts, `None` for file parts
    pub value: Option<String>,
    /// Raw bytes after the header divider
    pub data: Vec<u8>,
}

impl MultipartPart {
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }
}

const CRLF: &[u8] = b"\r\n";
const HEADER_DIVIDER: &[u8] = b"\r\n\r\n";

/// Parse a raw `multipart/form-data` body delimited by `boundary`.
pub fn parse(body: &[u8], boundary: &str) -> crate::IconResult<Vec<MultipartPart>> {
    if boundary.is_empty() {
        return Err(crate::IconError::MalformedMultipart(
            "empty boundary".to_string(),
        ));
    }

    let open_marker = format!("--{}", boundary).into_bytes();
    let close_marker = format!("--{}--", boundary).into_bytes();
    let separator = format!("\r\n--{}", boundary).into_bytes();

    let start = find(body, &open_marker, 0).ok_or_else(|| {
        crate::IconError::MalformedMultipart("opening boundary not found".to_string())
    })?;

    // `--X--` right at the start: a form with no parts
    if body[start..].starts_with(&close_marker) {
        return Ok(Vec::new());
    }

    // Searched past the opening marker: with a `-` in the boundary the closing
    // marker could otherwise overlap it
    let end = find(body, &close_marker, start + open_marker.len()).ok_or_else(|| {
        crate::IconError::MalformedMultipart("closing boundary not found".to_string())
    })?;

    // The CRLF in front of the closing marker belongs to the delimiter, not the last part
    let mut region = &body[start + open_marker.len()..end];
    if region.ends_with(CRLF) {
        region = &region[..region.len() - CRLF.len()];
    }

    let mut parts = Vec::new();
    let mut segment_start = 0;
    while let Some(segment_end) = find(region, &separator, segment_start) {
        if let Some(part) = parse_part(&region[segment_start..segment_end]) {
            parts.push(part);
        }
        segment_start = segment_end + separator.len();
    }
    if let Some(part) = parse_part(&region[segment_start..]) {
        parts.push(part);
    }

    Ok(parts)
}

fn parse_part(segment: &[u8]) -> Option<MultipartPart> {
    // Every segment begins with the line break that ends the boundary line
    let segment = segment.strip_prefix(CRLF).unwrap_or(segment);

    let divider = find(segment, HEADER_DIVIDER, 0)?;
    let headers = String::from_utf8_lossy(&segment[..divider]);
    let data = &segment[divider + HEADER_DIVIDER.len()..];

    let disposition = headers
        .lines()
        .find(|line| {
            line.trim_start()
                .to_ascii_lowercase()
                .starts_with("content-disposition:")
        })
        .unwrap_or(headers.as_ref());

    let name = disposition_param(disposition, "name")?;
    let filename = disposition_param(disposition, "filename");

    let value = match filename {
        Some(_) => None,
        None => Some(String::from_utf8_lossy(data).trim().to_string()),
    };

    Some(MultipartPart {
        name,
        filename,
        value,
        data: data.to_vec(),
    })
}

/// Read a quoted `key="value"` parameter, matching whole parameter names only so
/// that `filename=` is never mistaken for `name=`.
fn disposition_param(header: &str, key: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();
    let needle = format!("{}=\"", key);
    let mut from = 0;

    while let Some(pos) = lower[from..].find(&needle) {
        let idx = from + pos;
        let preceded_ok = idx == 0
            || matches!(lower.as_bytes()[idx - 1], b';' | b' ' | b'\t' | b':');
        let value_start = idx + needle.len();

        if preceded_ok {
            let rest = &header[value_start..];
            let value_end = rest.find('"')?;
            let value = &rest[..value_end];
            return if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        from = value_start;
    }

    None
}

/// Extract the boundary token from a `multipart/form-data` `Content-Type` header.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    if !content_type
        .to_ascii_lowercase()
        .contains("multipart/form-data")
    {
        return None;
    }

    content_type.split(';').find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Look up the first field (non-file) value with the given name
pub fn field<'a>(parts: &'a [MultipartPart], name: &str) -> Option<&'a str> {
    parts
        .iter()
        .find(|p| p.name == name && !p.is_file())
        .and_then(|p| p.value.as_deref())
}

/// Look up the first file part with the given name
pub fn file<'a>(parts: &'a [MultipartPart], name: &str) -> Option<&'a MultipartPart> {
    parts.iter().find(|p| p.name == name && p.is_file())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}
