//! Path sanitisation (§4.4): makes a catalog-derived name safe to use as a path component on a
//! given platform, without touching path separators.

const NON_COLON_ILLEGAL: &[char] = &['"', '*', '<', '>', '?', '|'];

/// True when `segment` looks like a Windows drive letter followed by a colon (`C:`), the one
/// case where a colon is legal rather than illegal.
fn is_drive_letter_colon(chars: &[char], idx: usize) -> bool {
    idx == 1 && chars[idx] == ':' && chars[0].is_ascii_alphabetic()
}

/// Replaces characters illegal in a filesystem path component for the target platform,
/// identified by its path separator (`std::path::MAIN_SEPARATOR` for the current one). The
/// path separator itself is never touched; callers sanitise one component at a time.
///
/// On `\`-separator (Windows) platforms: a drive-letter colon (`C:`) at the start of the
/// string is left alone, and any other colon is replaced with `;` instead of `_`, since DAT
/// game names frequently use `" : "` as a title/subtitle separator and `_` reads worse there
/// than `;` does. On every other platform a colon has no special status and is replaced with
/// `_` like the rest of the illegal set.
pub fn sanitize_component(name: &str, separator: char) -> String {
    let windows = separator == '\\';
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(chars.len());

    for (i, &c) in chars.iter().enumerate() {
        if c == ':' {
            if windows && is_drive_letter_colon(&chars, i) {
                out.push(c);
            } else if windows {
                out.push(';');
            } else {
                out.push('_');
            }
        } else if NON_COLON_ILLEGAL.contains(&c) {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_quote_asterisk_and_pipe() {
        assert_eq!(
            sanitize_component("Pokemon * Red\"Blue|Green", '/'),
            "Pokemon _ Red_Blue_Green"
        );
    }

    #[test]
    fn preserves_windows_drive_letter_colon() {
        assert_eq!(sanitize_component("C:\\Games\\Foo", '\\'), "C:\\Games\\Foo");
    }

    #[test]
    fn replaces_non_drive_colon_with_semicolon_on_windows() {
        assert_eq!(
            sanitize_component("Zelda: A Link to the Past", '\\'),
            "Zelda; A Link to the Past"
        );
    }

    #[test]
    fn leading_colon_not_treated_as_drive_letter() {
        assert_eq!(sanitize_component(":Weird", '\\'), "_Weird");
    }

    #[test]
    fn replaces_every_colon_with_underscore_on_unix() {
        assert_eq!(
            sanitize_component("Zelda: A Link to the Past", '/'),
            "Zelda_ A Link to the Past"
        );
        assert_eq!(sanitize_component("C:\\Games\\Foo", '/'), "C_\\Games\\Foo");
    }
}
