//! Utilidades mínimas para emitir fragmentos HTML.

use std::fmt::Write;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Formato numérico de las tablas (`%.6f`, `NaN` para valores ausentes).
pub fn number(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        format!("{v:.6}")
    }
}

/// Tabla con cabecera de columnas y filas etiquetadas, al estilo `DataFrame.to_html`.
pub fn labeled_table(out: &mut String, classes: &str, columns: &[&str], rows: &[(String, Vec<String>)]) {
    let _ = writeln!(out, "<table border=\"1\" class=\"dataframe {}\">", escape(classes));
    out.push_str("  <thead>\n    <tr style=\"text-align: right;\">\n      <th></th>\n");
    for c in columns {
        let _ = writeln!(out, "      <th>{}</th>", escape(c));
    }
    out.push_str("    </tr>\n  </thead>\n  <tbody>\n");
    for (label, cells) in rows {
        out.push_str("    <tr>\n");
        let _ = writeln!(out, "      <th>{}</th>", escape(label));
        for cell in cells {
            let _ = writeln!(out, "      <td>{}</td>", escape(cell));
        }
        out.push_str("    </tr>\n");
    }
    out.push_str("  </tbody>\n</table>");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn formats_numbers_like_pandas_defaults() {
        assert_eq!(number(1.0), "1.000000");
        assert_eq!(number(f64::NAN), "NaN");
        assert_eq!(number(-0.1234567), "-0.123457");
    }
}
