//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum shared by every bounded context.
//! Each kind maps to exactly one HTTP status code.

use serde::Serialize;

/// エラー種別の列挙体
///
/// サービス全体で共通のエラー分類を定義します。
/// 各バリアントは一つの HTTP ステータスコードにマッピングされます。
///
/// ## Notes
/// * `Unavailable` のみが再試行可能 (`is_retryable`)
/// * `PartialFailure` は複数ステップの削除が途中で止まったことを示す
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::LimitExceeded;
/// assert_eq!(kind.status_code(), 429);
/// assert_eq!(kind.as_str(), "Limit Exceeded");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// 400 - 入力形式が不正 (email, password, header, body)
    Validation,
    /// 401 - 認証失敗 (資格情報、トークン、セッション)
    Authentication,
    /// 403 - 権限不足 (管理者専用操作)
    Authorization,
    /// 404 - リソースが見つからない
    NotFound,
    /// 409 - 一意制約違反 (重複 email)
    Conflict,
    /// 410 - 期限切れ (QR コード)
    Expired,
    /// 429 - 利用上限に到達
    LimitExceeded,
    /// 500 - カスケード削除が途中で失敗
    PartialFailure,
    /// 500 - 想定外のエラー
    Internal,
    /// 503 - タイムアウト、一時的なバックエンド障害
    Unavailable,
}

impl ErrorKind {
    /// HTTP ステータスコードを取得
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::Validation.status_code(), 400);
    /// assert_eq!(ErrorKind::Expired.status_code(), 410);
    /// ```
    #[inline]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Authentication => 401,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Expired => 410,
            ErrorKind::LimitExceeded => 429,
            ErrorKind::PartialFailure => 500,
            ErrorKind::Internal => 500,
            ErrorKind::Unavailable => 503,
        }
    }

    /// ユーザー向けの文字列表現を取得
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Validation Error",
            ErrorKind::Authentication => "Authentication Failure",
            ErrorKind::Authorization => "Authorization Failure",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Expired => "Expired",
            ErrorKind::LimitExceeded => "Limit Exceeded",
            ErrorKind::PartialFailure => "Partial Failure",
            ErrorKind::Internal => "Internal Error",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    /// 再試行で成功し得るエラーかどうか
    ///
    /// タイムアウトと一時的な障害 (`Unavailable`) のみ `true`。
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Unavailable)
    }

    /// サーバー側のエラーかどうかを判定
    ///
    /// 5xx系のエラーは `true` を返します。
    /// これらのエラーはログに記録すべきです。
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// クライアント側のエラーかどうかを判定
    #[inline]
    pub const fn is_client_error(&self) -> bool {
        let code = self.status_code();
        code >= 400 && code < 500
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
