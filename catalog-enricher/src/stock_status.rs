//! Stock-status labels and the classification prompt.

use std::fmt;

/// Name of the column added to the catalog.
pub const STOCK_STATUS_COLUMN: &str = "stock_status";

pub const SYSTEM_PROMPT: &str = "あなたは在庫ステータスを生成するアシスタントです。";

/// Builds the user prompt for one product name.
pub fn user_prompt(name: &str) -> String {
    format!(
        "以下の商品に対して適切な在庫ステータスを生成してください。\n\n\
         商品名: {name}\n\n\
         在庫ステータスは次のいずれかから選んでください: 'あり', '残りわずか', 'なし'。\n\
         回答は必ず1つの選択肢のみを返してください。"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub const ALL: [StockStatus; 3] = [
        StockStatus::InStock,
        StockStatus::LowStock,
        StockStatus::OutOfStock,
    ];

    /// Used whenever the model answers outside the allowed set.
    pub const FALLBACK: StockStatus = StockStatus::OutOfStock;

    pub fn label(self) -> &'static str {
        match self {
            StockStatus::InStock => "あり",
            StockStatus::LowStock => "残りわずか",
            StockStatus::OutOfStock => "なし",
        }
    }

    /// Exact match against the three labels, after trimming whitespace.
    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|s| s.label() == raw)
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
