// 📱 Farmer notification text for an authorized payout

use crate::ledger::PayoutRecord;

pub fn payout_message(record: &PayoutRecord) -> String {
    format!(
        "✅ ALERT: ₹{} has been credited to {} bank account due to verified drought conditions. Ref: {}",
        record.amount, record.farmer_id, record.transaction_id
    )
}
