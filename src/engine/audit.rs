// ==========================================
// 学业进程管理系统 - 审计落地
// ==========================================
// 职责: 定义审计 sink trait，引擎只依赖 trait
// 红线: 审计在业务事务提交之后执行，失败只记日志，不回滚业务
// ==========================================

use crate::config::ConfigManager;
use crate::db::Database;
use crate::domain::audit_log::{AuditEntry, OperationType};
use crate::engine::clock::Clock;
use crate::repository::AuditLogRepository;
use std::error::Error;
use std::sync::Arc;
use uuid::Uuid;

// ==========================================
// 审计 Sink Trait
// ==========================================

/// 审计记录者
///
/// # 实现说明
/// - `SqliteAuditSink`: 写入 audit_log 表
/// - `NoOpAuditSink`: 丢弃（单元测试、关闭审计时）
pub trait AuditSink: Send + Sync {
    /// 记录一条审计
    ///
    /// # 参数
    /// - `message`: 人类可读描述
    /// - `operation`: 操作类型
    /// - `actor`: 操作人（空字符串由实现决定默认值）
    fn record(
        &self,
        message: &str,
        operation: OperationType,
        actor: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作审计
#[derive(Debug, Clone, Default)]
pub struct NoOpAuditSink;

impl AuditSink for NoOpAuditSink {
    fn record(
        &self,
        message: &str,
        operation: OperationType,
        _actor: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!("NoOpAuditSink: 跳过审计 - operation={}, message={}", operation, message);
        Ok(())
    }
}

// ==========================================
// SqliteAuditSink
// ==========================================
pub struct SqliteAuditSink {
    db: Database,
    clock: Arc<dyn Clock>,
    default_actor: String,
}

impl SqliteAuditSink {
    pub fn new(db: Database, clock: Arc<dyn Clock>, default_actor: impl Into<String>) -> Self {
        Self {
            db,
            clock,
            default_actor: default_actor.into(),
        }
    }

    /// 按配置构建审计 sink（audit.enabled=false 时返回 NoOp）
    pub fn from_config(
        db: Database,
        clock: Arc<dyn Clock>,
        config: &ConfigManager,
    ) -> Result<Arc<dyn AuditSink>, Box<dyn Error>> {
        if !config.is_audit_enabled()? {
            tracing::info!("审计已关闭 (audit.enabled=false)");
            return Ok(Arc::new(NoOpAuditSink));
        }
        let default_actor = config.get_default_actor()?;
        Ok(Arc::new(Self::new(db, clock, default_actor)))
    }
}

impl AuditSink for SqliteAuditSink {
    fn record(
        &self,
        message: &str,
        operation: OperationType,
        actor: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let actor = if actor.trim().is_empty() {
            self.default_actor.as_str()
        } else {
            actor.trim()
        };

        let entry = AuditEntry {
            audit_id: Uuid::new_v4().to_string(),
            operation: operation.as_str().to_string(),
            message: message.to_string(),
            actor: actor.to_string(),
            recorded_at: self.clock.now(),
        };

        self.db
            .write(|tx| AuditLogRepository::new(tx).insert(&entry))
            .map_err(|e| Box::new(e) as Box<dyn Error + Send + Sync>)?;
        Ok(())
    }
}

// ==========================================
// AuditRecorder - 引擎持有的审计入口
// ==========================================

/// 简化 Option<Arc<dyn AuditSink>> 的使用
#[derive(Clone)]
pub struct AuditRecorder {
    inner: Option<Arc<dyn AuditSink>>,
}

impl AuditRecorder {
    pub fn with_sink(sink: Arc<dyn AuditSink>) -> Self {
        Self { inner: Some(sink) }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 事务提交后调用；失败只告警
    pub fn record(&self, message: &str, operation: OperationType, actor: &str) {
        match &self.inner {
            Some(sink) => {
                if let Err(e) = sink.record(message, operation, actor) {
                    tracing::warn!(
                        "审计写入失败(业务已提交): operation={}, error={}",
                        operation,
                        e
                    );
                }
            }
            None => {
                tracing::debug!("AuditRecorder: 未配置审计，跳过 - operation={}", operation);
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::none()
    }
}
