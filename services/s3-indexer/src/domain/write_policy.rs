/// 書き込み競合ポリシー
///
/// 同一キーに対する作成/削除が順不同で届いた場合の扱いを決める。
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// ポリシー文字列の解析エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("不明な書き込みポリシー: {0}（last-write-wins または newer-timestamp-wins）")]
pub struct WritePolicyParseError(pub String);

/// 書き込み競合ポリシー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// 無条件に上書き・削除する（ストアが最後に受け付けた書き込みが勝つ）
    #[default]
    LastWriteWins,
    /// 保存済みTimeStampがイベント時刻以下の場合のみ書き込む
    ///
    /// 比較はDynamoDBの文字列比較。S3の固定幅UTC時刻では時系列順と一致する。
    /// 削除イベントもeventTimeが必須になる。
    ///
    /// 制限: 削除は墓標を残さないため、削除後に届いた削除より古い作成イベントは
    /// `attribute_not_exists`で通り、行が復活する。
    NewerTimestampWins,
}

impl WritePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritePolicy::LastWriteWins => "last-write-wins",
            WritePolicy::NewerTimestampWins => "newer-timestamp-wins",
        }
    }

    /// 条件付き書き込みを行うか
    pub fn is_conditional(&self) -> bool {
        matches!(self, WritePolicy::NewerTimestampWins)
    }
}

impl FromStr for WritePolicy {
    type Err = WritePolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-write-wins" | "lww" => Ok(WritePolicy::LastWriteWins),
            "newer-timestamp-wins" | "newer-wins" => Ok(WritePolicy::NewerTimestampWins),
            _ => Err(WritePolicyParseError(s.to_string())),
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_last_write_wins() {
        assert_eq!(WritePolicy::default(), WritePolicy::LastWriteWins);
        assert!(!WritePolicy::default().is_conditional());
    }

    #[test]
    fn test_parse_known_values() {
        assert_eq!(
            "last-write-wins".parse::<WritePolicy>().unwrap(),
            WritePolicy::LastWriteWins
        );
        assert_eq!("LWW".parse::<WritePolicy>().unwrap(), WritePolicy::LastWriteWins);
        assert_eq!(
            " newer-timestamp-wins ".parse::<WritePolicy>().unwrap(),
            WritePolicy::NewerTimestampWins
        );
        assert_eq!(
            "newer-wins".parse::<WritePolicy>().unwrap(),
            WritePolicy::NewerTimestampWins
        );
    }

    #[test]
    fn test_parse_unknown_value() {
        let err = "first-write-wins".parse::<WritePolicy>().unwrap_err();
        assert_eq!(err, WritePolicyParseError("first-write-wins".to_string()));
        assert!(err.to_string().contains("first-write-wins"));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for policy in [WritePolicy::LastWriteWins, WritePolicy::NewerTimestampWins] {
            assert_eq!(policy.to_string().parse::<WritePolicy>().unwrap(), policy);
        }
    }
}
