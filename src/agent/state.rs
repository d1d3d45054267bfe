use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current state of an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub status: AgentStatus,
    pub current_task: Option<String>, // Task ID
    pub last_activity: DateTime<Utc>,
    pub performance_metrics: PerformanceMetrics,
    pub error_count: u64,
    pub success_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentStatus {
    Idle,
    Processing,
    Error,
}

/// Performance metrics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_tasks: u64,
    pub successful_tasks: u64,
    pub failed_tasks: u64,
    pub average_response_time_ms: f64,
    pub average_tokens_used: f64,
    pub tool_usage_stats: HashMap<String, ToolUsageStats>,
    pub last_reset: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUsageStats {
    pub usage_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub average_execution_time_ms: f64,
    pub last_used: Option<DateTime<Utc>>,
}

impl AgentState {
    pub fn new() -> Self {
        Self {
            status: AgentStatus::Idle,
            current_task: None,
            last_activity: Utc::now(),
            performance_metrics: PerformanceMetrics::new(),
            error_count: 0,
            success_count: 0,
        }
    }

    pub fn update_status(&mut self, status: AgentStatus) {
        self.status = status;
        self.last_activity = Utc::now();
    }

    pub fn start_task(&mut self, task_id: String) {
        self.current_task = Some(task_id);
        self.update_status(AgentStatus::Processing);
    }

    pub fn complete_task(&mut self, success: bool) {
        self.current_task = None;

        if success {
            self.success_count += 1;
            self.update_status(AgentStatus::Idle);
        } else {
            self.error_count += 1;
            self.update_status(AgentStatus::Error);
        }
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            total_tasks: 0,
            successful_tasks: 0,
            failed_tasks: 0,
            average_response_time_ms: 0.0,
            average_tokens_used: 0.0,
            tool_usage_stats: HashMap::new(),
            last_reset: Utc::now(),
        }
    }

    pub fn record_task_completion(&mut self, success: bool, response_time_ms: f64, tokens_used: u32) {
        self.total_tasks += 1;
        if success {
            self.successful_tasks += 1;
        } else {
            self.failed_tasks += 1;
        }

        // Running averages
        let n = self.total_tasks as f64;
        self.average_response_time_ms = (self.average_response_time_ms * (n - 1.0) + response_time_ms) / n;
        self.average_tokens_used = (self.average_tokens_used * (n - 1.0) + tokens_used as f64) / n;
    }

    pub fn record_tool_usage(&mut self, tool_name: String, success: bool, execution_time_ms: f64) {
        let stats = self.tool_usage_stats.entry(tool_name).or_insert(ToolUsageStats {
            usage_count: 0,
            success_count: 0,
            failure_count: 0,
            average_execution_time_ms: 0.0,
            last_used: None,
        });

        stats.usage_count += 1;
        if success {
            stats.success_count += 1;
        } else {
            stats.failure_count += 1;
        }
        let n = stats.usage_count as f64;
        stats.average_execution_time_ms = (stats.average_execution_time_ms * (n - 1.0) + execution_time_ms) / n;
        stats.last_used = Some(Utc::now());
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_averages() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_task_completion(true, 100.0, 10);
        metrics.record_task_completion(false, 300.0, 30);

        assert_eq!(metrics.total_tasks, 2);
        assert_eq!(metrics.average_response_time_ms, 200.0);
        assert_eq!(metrics.average_tokens_used, 20.0);
        assert_eq!(metrics.successful_tasks, 1);
        assert_eq!(metrics.failed_tasks, 1);
    }

    #[test]
    fn test_tool_usage_stats() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_tool_usage("delegate_work_to_coworker".to_string(), true, 10.0);
        metrics.record_tool_usage("delegate_work_to_coworker".to_string(), false, 30.0);

        let stats = &metrics.tool_usage_stats["delegate_work_to_coworker"];
        assert_eq!(stats.usage_count, 2);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.average_execution_time_ms, 20.0);
        assert!(stats.last_used.is_some());
    }

    #[test]
    fn test_task_lifecycle() {
        let mut state = AgentState::new();
        state.start_task("t1".to_string());
        assert_eq!(state.status, AgentStatus::Processing);
        state.complete_task(false);
        assert_eq!(state.status, AgentStatus::Error);
        assert_eq!(state.error_count, 1);
        assert!(state.current_task.is_none());
    }
}
