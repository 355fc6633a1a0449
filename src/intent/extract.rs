//! 从模型回复中截取 JSON 数组
//!
//! 模型常在数组前后加说明或代码块；取第一个「`[` 后紧跟 `{`」的位置，按括号配对（跳过字符串内容）找到对应的 `]`。
//! 有多个数组时取第一个；找不到配对时返回原文，交给 JSON 解析报错。

pub fn extract_json_array(text: &str) -> &str {
    let bytes = text.as_bytes();
    let Some(start) = find_array_start(bytes) else {
        return text;
    };
    match find_matching_end(bytes, start) {
        Some(end) => &text[start..=end],
        None => text,
    }
}

fn find_array_start(bytes: &[u8]) -> Option<usize> {
    bytes.iter().enumerate().find_map(|(i, b)| {
        if *b != b'[' {
            return None;
        }
        let next = bytes[i + 1..].iter().find(|c| !c.is_ascii_whitespace())?;
        (*next == b'{').then_some(i)
    })
}

fn find_matching_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_array() {
        assert_eq!(extract_json_array(r#"[{"tool":"none"}]"#), r#"[{"tool":"none"}]"#);
    }

    #[test]
    fn test_code_fence_and_prose() {
        let raw = "Sure! Here is the plan:\n```json\n[\n  {\"tool\": \"news\", \"keyword\": \"Apple\"}\n]\n```\nLet me know.";
        assert_eq!(
            extract_json_array(raw),
            "[\n  {\"tool\": \"news\", \"keyword\": \"Apple\"}\n]"
        );
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let raw = r#"x [{"tool":"web_search","query":"what is [a]} ?"}] y"#;
        assert_eq!(
            extract_json_array(raw),
            r#"[{"tool":"web_search","query":"what is [a]} ?"}]"#
        );
    }

    #[test]
    fn test_skips_non_object_brackets_and_takes_first_array() {
        let raw = r#"options [1, 2] then [{"tool":"news"}] or [{"tool":"none"}]"#;
        assert_eq!(extract_json_array(raw), r#"[{"tool":"news"}]"#);
    }

    #[test]
    fn test_unbalanced_returns_original() {
        let raw = r#"[{"tool":"news""#;
        assert_eq!(extract_json_array(raw), raw);
        assert_eq!(extract_json_array("no json here"), "no json here");
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let raw = r#"[{"tool":"news","keyword":"say \"hi]\""}]"#;
        assert_eq!(extract_json_array(raw), raw);
    }
}
