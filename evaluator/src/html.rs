//! HTML escaping (§6). Given in full by the specification even though the
//! general-purpose escaper is otherwise an external collaborator.

pub fn escape(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for ch in input.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      '`' => out.push_str("&#x60;"),
      other => out.push(other),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escapes_all_special_characters() {
    assert_eq!(escape(r#"<a href='x'>&"back`tick"#), "&lt;a href=&#x27;x&#x27;&gt;&amp;&quot;back&#x60;tick");
  }

  #[test]
  fn leaves_plain_text_untouched() {
    assert_eq!(escape("hello world"), "hello world");
  }
}
