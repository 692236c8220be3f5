//! # Name Sanitizer Module
//!
//! Trasformazione pura dei nomi di file e cartelle usata sia in upload che in delete.
//!
//! ## Regole:
//! 1. Lower-case dell'input
//! 2. Ogni carattere fuori da `[a-z0-9-]` diventa `-`
//! 3. Sequenze di `-` collassate in uno solo
//! 4. `-` iniziali e finali rimossi
//!
//! Il risultato può essere vuoto: la validazione a valle deve rifiutarlo.
//!
//! ## Esempio:
//! ```rust
//! use icon_host::sanitize::{sanitize, split_file_name};
//!
//! assert_eq!(sanitize("My Icon!!"), "my-icon");
//! assert_eq!(split_file_name("Logo.SVG"), ("Logo", Some("svg".to_string())));
//! ```

/// Restrict a name to lower-case letters, digits and single inner hyphens.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_hyphen = false;

    for ch in raw.chars().flat_map(char::to_lowercase) {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            ch
        } else {
            '-'
        };

        if ch == '-' {
            if !last_was_hyphen {
                out.push('-');
            }
            last_was_hyphen = true;
        } else {
            out.push(ch);
            last_was_hyphen = false;
        }
    }

    out.trim_matches('-').to_string()
}

/// Split a file name into its base name and lower-cased extension (without dot).
///
/// Mirrors the usual "last dot" rule: a leading dot alone (`.gitkeep`) is not an
/// extension, and a trailing dot yields no extension.
pub fn split_file_name(file_name: &str) -> (&str, Option<String>) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, None),
        Some(idx) if idx + 1 == file_name.len() => (&file_name[..idx], None),
        Some(idx) => (
            &file_name[..idx],
            Some(file_name[idx + 1..].to_lowercase()),
        ),
    }
}

/// Lower-cased extension of a file name, without the dot
pub fn extension_of(file_name: &str) -> Option<String> {
    split_file_name(file_name).1
}

/// Strip any directory components a client may have sent along with the file name
/// (`C:\Users\me\icon.png`, `../../icon.png`).
pub fn base_file_name(original: &str) -> &str {
    original
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(original)
}
