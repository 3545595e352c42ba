use super::{
    PatchError, RewriteStrategy, indent_body, leading_whitespace, line_ending,
    string_continuation_rows,
};

const INDENT_STEP: &str = "    ";

/// Indentation-based body replacement, used when no parser is available.
///
/// The body of a function is every line after its signature that is blank or
/// indented one level deeper than the `def` line, plus rows inside a
/// multi-line string. Trailing blank lines of that span are left in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRewriter;

impl RewriteStrategy for TextRewriter {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn rewrite(
        &self,
        source: &str,
        function_name: &str,
        body: &[String],
    ) -> Result<String, PatchError> {
        let lines: Vec<&str> = source.lines().collect();
        let in_string = string_continuation_rows(&lines);
        let header = (0..lines.len())
            .find(|&i| !in_string[i] && is_header(lines[i], function_name))
            .ok_or_else(|| PatchError::FunctionNotFound(function_name.to_string()))?;

        let indent = format!("{}{INDENT_STEP}", leading_whitespace(lines[header]));
        let (sig_end, inline_at) = signature_end(&lines, header);

        let mut end = sig_end + 1;
        while end < lines.len()
            && (in_string[end] || lines[end].starts_with(&indent) || lines[end].trim().is_empty())
        {
            end += 1;
        }
        while end > sig_end + 1 && !in_string[end - 1] && lines[end - 1].trim().is_empty() {
            end -= 1;
        }

        let mut updated: Vec<String> = lines[..sig_end].iter().map(|l| l.to_string()).collect();
        let sig_line = lines[sig_end];
        updated.push(match inline_at {
            // `def f(): return 1` keeps only the signature part
            Some(colon) => sig_line[..=colon].to_string(),
            None => sig_line.to_string(),
        });
        updated.extend(indent_body(body, &indent, &string_continuation_rows(body)));
        updated.extend(lines[end..].iter().map(|l| l.to_string()));

        let newline = line_ending(source);
        let mut rendered = updated.join(newline);
        if source.ends_with('\n') {
            rendered.push_str(newline);
        }
        Ok(rendered)
    }
}

fn is_header(line: &str, function_name: &str) -> bool {
    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix("async ").map_or(trimmed, str::trim_start);
    trimmed
        .strip_prefix("def ")
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix(function_name))
        .is_some_and(|rest| rest.trim_start().starts_with('('))
}

/// Locate the `:` that closes the signature starting at line `header`.
///
/// Returns the index of the line holding it and, when code follows the colon
/// on that line, the colon's byte offset. Falls back to the header line when
/// no closing colon is found.
fn signature_end(lines: &[&str], header: usize) -> (usize, Option<usize>) {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;

    for (idx, line) in lines.iter().enumerate().skip(header) {
        let mut chars = line.char_indices().peekable();
        while let Some((pos, ch)) = chars.next() {
            if let Some(q) = quote {
                if ch == '\\' {
                    chars.next();
                } else if ch == q {
                    quote = None;
                }
                continue;
            }
            match ch {
                '\'' | '"' => quote = Some(ch),
                '#' => break,
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                ':' if depth == 0 => {
                    let rest = line[pos + 1..].trim();
                    let inline = !rest.is_empty() && !rest.starts_with('#');
                    return (idx, inline.then_some(pos));
                }
                _ => {}
            }
        }
        // strings do not span lines in a signature
        quote = None;
    }
    (header, None)
}
