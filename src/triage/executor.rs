use crate::{
    domain::BatchPlan,
    mailbox::{BatchModify, MailboxProvider},
};

const TRASH_ADD: [&str; 1] = ["TRASH"];
const TRASH_REMOVE: [&str; 3] = ["INBOX", "UNREAD", "IMPORTANT"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub trashed: usize,
    pub moved: usize,
    pub failed_batches: usize,
}

/// Applies a plan with one trash call and one call per destination label.
///
/// Calls are independent: a failed batch is logged and the others still run.
/// Messages in a failed batch stay in the inbox for the next cycle.
pub async fn execute(provider: &dyn MailboxProvider, plan: &BatchPlan) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    if plan.is_empty() {
        tracing::debug!(target: "executor", "nothing to apply");
        return report;
    }

    if !plan.trash().is_empty() {
        let count = plan.trash().len();
        tracing::info!(target: "executor", count, "trashing messages");
        let request = BatchModify {
            ids: plan.trash().iter().cloned().collect(),
            add_label_ids: to_strings(&TRASH_ADD),
            remove_label_ids: to_strings(&TRASH_REMOVE),
        };
        match provider.batch_modify(&request).await {
            Ok(()) => report.trashed += count,
            Err(err) => {
                report.failed_batches += 1;
                tracing::error!(target: "executor", error = %err, count, "trash batch failed");
            }
        }
    }

    for (label_id, ids) in plan.moves() {
        if ids.is_empty() || label_id.eq_ignore_ascii_case("INBOX") {
            continue;
        }
        let count = ids.len();
        tracing::info!(target: "executor", label_id = %label_id, count, "moving messages");
        let request = BatchModify {
            ids: ids.iter().cloned().collect(),
            add_label_ids: vec![label_id.clone()],
            remove_label_ids: vec!["INBOX".to_string()],
        };
        match provider.batch_modify(&request).await {
            Ok(()) => report.moved += count,
            Err(err) => {
                report.failed_batches += 1;
                tracing::error!(
                    target: "executor",
                    error = %err,
                    label_id = %label_id,
                    count,
                    "move batch failed"
                );
            }
        }
    }

    report
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
