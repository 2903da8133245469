//! `:name` placeholders to positional `?` markers.

/// SQL with `?` markers and the parameter names in bind order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedSql {
    pub sql: String,
    pub names: Vec<String>,
}

/// Rewrite `:name` placeholders outside quoted strings and quoted identifiers.
///
/// `::`, `:=` and a colon following an identifier (`label: LOOP`) are left alone.
pub fn expand_named(sql: &str) -> ExpandedSql {
    let mut out = String::with_capacity(sql.len());
    let mut names = Vec::new();
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(open) = quote {
            out.push(ch);
            if ch == '\\' && open != '`' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if ch == open {
                if chars.peek() == Some(&open) {
                    if let Some(doubled) = chars.next() {
                        out.push(doubled);
                    }
                } else {
                    quote = None;
                }
            }
            prev = Some(ch);
            continue;
        }

        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                out.push(ch);
            }
            ':' if starts_name(chars.peek().copied()) && !follows_word(prev) => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push('?');
                names.push(name);
                prev = Some('?');
                continue;
            }
            _ => out.push(ch),
        }
        prev = Some(ch);
    }

    ExpandedSql { sql: out, names }
}

fn starts_name(ch: Option<char>) -> bool {
    ch.is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_')
}

fn follows_word(prev: Option<char>) -> bool {
    prev.is_some_and(|ch| ch.is_alphanumeric() || ch == '_' || ch == ':')
}
