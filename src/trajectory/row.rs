/// 記録ファイルの既定区切り文字
pub const DEFAULT_DELIMITER: char = ',';

/// 1行を区切り文字で分割し、各トークンの前後の空白を除去する。
///
/// スキーマを知らないので列数の検証はしない（デコーダ側で行う）。
pub fn split_row(line: &str, delimiter: char) -> Vec<&str> {
    line.split(delimiter).map(str::trim).collect()
}

/// ヘッダ行（0行目）を除いたデータ行を (1始まりの行番号, 行) で返す。
///
/// 空行はデータ行として扱わない。
pub fn data_rows(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line))
}
