//! Placeholder lexer for `{{NAME}}` template variables using logos

use logos::Logos;

/// Byte range in a leaf string
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Token {
    /// A run of opening braces; the last two may open a placeholder
    #[regex(r"\{+")]
    Open,
    #[token("}}")]
    Close,
    #[regex("[A-Z_]+")]
    Name,
    #[regex(r"[^{}A-Z_]+")]
    Text,
    #[token("}")]
    Brace,
}

/// A piece of a leaf string: literal text or a placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// Variable name, without the braces
    Placeholder(&'a str),
}

/// A placeholder with no binding
#[derive(Debug, Clone, PartialEq)]
pub struct Unbound(pub String);

/// Collapse `{{ NAME }}` into `{{NAME}}`
pub fn normalize(text: &str) -> String {
    text.replace("{{ ", "{{").replace(" }}", "}}")
}

/// Split an already normalized string into text and placeholder segments
///
/// Only `{{` + uppercase letters or underscores + `}}` form a placeholder;
/// any other brace is literal text.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let tokens: Vec<(Token, Span)> = Token::lexer(text)
        .spanned()
        .map(|(tok, span)| (tok.unwrap_or(Token::Text), span))
        .collect();

    let mut segments = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i..] {
            [(Token::Open, open), (Token::Name, name), (Token::Close, _), ..]
                if open.len() >= 2 =>
            {
                if open.len() > 2 {
                    segments.push(Segment::Text(&text[open.start..open.end - 2]));
                }
                segments.push(Segment::Placeholder(&text[name.clone()]));
                i += 3;
            }
            [(_, span), ..] => {
                segments.push(Segment::Text(&text[span.clone()]));
                i += 1;
            }
            [] => break,
        }
    }
    segments
}

/// Replace every placeholder in `text` by the value `lookup` returns for its name
///
/// Replaced values are inserted as-is and never scanned again.
pub fn substitute<'s, F>(text: &str, lookup: F) -> Result<String, Unbound>
where
    F: Fn(&str) -> Option<&'s str>,
{
    let normalized = normalize(text);
    let mut out = String::with_capacity(normalized.len());
    for segment in segments(&normalized) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Placeholder(name) => match lookup(name) {
                Some(value) => out.push_str(value),
                None => return Err(Unbound(format!("{{{{{}}}}}", name))),
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup(name: &str) -> Option<&'static str> {
        match name {
            "ROBOT_ID" => Some("r1"),
            "AREA_ID" => Some("zone1"),
            "NESTED" => Some("{{AREA_ID}}"),
            _ => None,
        }
    }

    #[test]
    fn test_segments() {
        assert_eq!(
            segments("http://roscore-{{ROBOT_ID}}:11311"),
            vec![
                Segment::Text("http://roscore-"),
                Segment::Placeholder("ROBOT_ID"),
                Segment::Text(":11311"),
            ]
        );
    }

    #[test]
    fn test_lowercase_is_not_a_placeholder() {
        let joined: String = segments("{{robot_id}}")
            .into_iter()
            .map(|s| match s {
                Segment::Text(t) => t,
                Segment::Placeholder(_) => panic!("unexpected placeholder"),
            })
            .collect();
        assert_eq!(joined, "{{robot_id}}");
    }

    #[test]
    fn test_substitute_multiple() {
        assert_eq!(
            substitute("{{ROBOT_ID}}-{{AREA_ID}}-{{ROBOT_ID}}", lookup),
            Ok("r1-zone1-r1".to_string())
        );
    }

    #[test]
    fn test_substitute_spacing() {
        assert_eq!(substitute("{{ ROBOT_ID }}", lookup), Ok("r1".to_string()));
        assert_eq!(substitute("{{ROBOT_ID }}", lookup), Ok("r1".to_string()));
    }

    #[test]
    fn test_unbound() {
        assert_eq!(
            substitute("x {{UNBOUND}} y", lookup),
            Err(Unbound("{{UNBOUND}}".to_string()))
        );
    }

    #[test]
    fn test_inserted_values_are_not_rescanned() {
        assert_eq!(substitute("{{NESTED}}", lookup), Ok("{{AREA_ID}}".to_string()));
    }

    /// A placeholder written by an inserted value stays literal even when the
    /// same name is expanded elsewhere in the leaf; repeated find-and-replace
    /// would turn this into `zone1 zone1`.
    #[test]
    fn test_single_pass_with_repeated_name() {
        assert_eq!(
            substitute("{{NESTED}} {{AREA_ID}}", lookup),
            Ok("{{AREA_ID}} zone1".to_string())
        );
    }

    #[test]
    fn test_stray_braces() {
        assert_eq!(substitute("{a}} {{", lookup), Ok("{a}} {{".to_string()));
        assert_eq!(substitute("{{{ROBOT_ID}}}", lookup), Ok("{r1}".to_string()));
        assert_eq!(substitute("{ROBOT_ID}", lookup), Ok("{ROBOT_ID}".to_string()));
    }
}
