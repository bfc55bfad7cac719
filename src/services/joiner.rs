//! 结果拼接 - 业务能力层

use crate::models::document::SENTINEL;

/// 拼接各部分输出为最终文档
///
/// 去掉每一部分里的所有结束标记，丢弃空的部分，用空行连接，末尾恰好追加一个结束标记行。
/// 幂等：`join(&[join(parts)]) == join(parts)`。
pub fn join<S: AsRef<str>>(outputs: &[S]) -> String {
    let pieces: Vec<String> = outputs
        .iter()
        .map(|o| clean_piece(o.as_ref()))
        .filter(|p| !p.is_empty())
        .collect();

    if pieces.is_empty() {
        return SENTINEL.to_string();
    }

    format!("{}\n{}", pieces.join("\n\n"), SENTINEL)
}

fn clean_piece(piece: &str) -> String {
    // 删除后可能拼出新的标记，如 "------END---END---"
    let mut text = piece.replace(SENTINEL, "");
    while text.contains(SENTINEL) {
        text = text.replace(SENTINEL, "");
    }

    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
