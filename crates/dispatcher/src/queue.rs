use std::collections::VecDeque;

use sandworm_domain::ExecutionRecord;

/// 等待工作节点的执行队列，严格先进先出，无容量上限
#[derive(Debug, Default)]
pub struct ExecutionQueue {
    records: VecDeque<ExecutionRecord>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加到队尾
    pub fn push(&mut self, record: ExecutionRecord) {
        self.records.push_back(record);
    }

    /// 从队头取出
    pub fn pop(&mut self) -> Option<ExecutionRecord> {
        self.records.pop_front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按队列顺序复制当前积压
    pub fn to_vec(&self) -> Vec<ExecutionRecord> {
        self.records.iter().cloned().collect()
    }
}
