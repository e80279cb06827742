// ==========================================
// MES辅助排程系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 转换仓储错误为
// 调用方友好的错误消息
// 约定: 校验错误在写入时同步拒绝, 不进入排程器
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("重复记录: {0}")]
    Duplicate(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::Duplicate(msg),
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
