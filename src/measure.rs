use unicode_width::UnicodeWidthStr;

use crate::model::Column;

pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub header_padding: f64,
    pub min_node_width: f64,
    pub min_node_height: f64,
    /// Room reserved left of each column name for the key glyph.
    pub key_gutter: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 26.0,
            padding_x: 12.0,
            padding_y: 4.0,
            header_padding: 6.0,
            min_node_width: 260.0,
            min_node_height: 40.0,
            key_gutter: 20.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    pub fn header_height(&self) -> f64 {
        self.line_height + self.header_padding * 2.0
    }

    pub fn node_size(&self, label: &str, columns: &[Column]) -> (f64, f64) {
        // Headers render uppercase.
        let header_width = self.text_width(&label.to_uppercase());

        let max_col_width = columns
            .iter()
            .map(|c| self.key_gutter + self.text_width(&c.name))
            .fold(0.0, f64::max);

        let content_width = header_width.max(max_col_width) + self.padding_x * 2.0;
        let width = content_width.max(self.min_node_width);

        let body_height = if columns.is_empty() {
            0.0
        } else {
            columns.len() as f64 * self.line_height + self.padding_y * 2.0
        };

        let height = (self.header_height() + body_height).max(self.min_node_height);

        (width, height)
    }

    /// Vertical center of the `index`-th column row, relative to the node top.
    pub fn row_center(&self, index: usize) -> f64 {
        self.header_height() + self.padding_y + (index as f64 + 0.5) * self.line_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_width() {
        let m = TextMetrics::default();
        assert_eq!(m.text_width("User"), 4.0 * 7.0);
    }

    #[test]
    fn test_unicode_width() {
        let m = TextMetrics::default();
        // Wide characters count double.
        assert_eq!(m.text_width("ユーザー"), 8.0 * 7.0);
    }

    #[test]
    fn test_node_size_no_columns() {
        let m = TextMetrics::default();
        let (w, h) = m.node_size("ORDERS", &[]);
        assert_eq!(w, m.min_node_width);
        assert_eq!(h, m.header_height().max(m.min_node_height));
    }

    #[test]
    fn test_node_size_grows_with_content() {
        let m = TextMetrics::default();
        let columns = vec![Column::new("id", true), Column::new("name", false)];
        let (_, h) = m.node_size("ORDERS", &columns);
        assert!(h > m.header_height() + m.line_height);

        let long = vec![Column::new("a".repeat(80), false)];
        let (w, _) = m.node_size("ORDERS", &long);
        assert!(w > m.min_node_width);
    }

    #[test]
    fn test_row_center() {
        let m = TextMetrics::default();
        assert!(m.row_center(1) - m.row_center(0) == m.line_height);
        assert!(m.row_center(0) > m.header_height());
    }
}
