use ethers::types::TxHash;
use log::info;
use std::{
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

/// Transaction history recorder.
pub trait TransactionRecorder: Send + Sync {
    fn add_transaction(&self, hash: TxHash, summary: String);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDetails {
    pub hash: TxHash,
    pub summary: String,
    pub added_time: u64,
}

/// In-memory history of submitted swaps, newest last.
#[derive(Debug, Default)]
pub struct TransactionHistory {
    transactions: Mutex<Vec<TransactionDetails>>,
}

impl TransactionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transactions(&self) -> Vec<TransactionDetails> {
        self.transactions.lock().unwrap().clone()
    }

    pub fn get(&self, hash: TxHash) -> Option<TransactionDetails> {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .find(|details| details.hash == hash)
            .cloned()
    }
}

impl TransactionRecorder for TransactionHistory {
    fn add_transaction(&self, hash: TxHash, summary: String) {
        let added_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();

        info!("recorded transaction {:?} - {}", hash, summary);

        let mut transactions = self.transactions.lock().unwrap();
        if transactions.iter().any(|details| details.hash == hash) {
            return;
        }
        transactions.push(TransactionDetails {
            hash,
            summary,
            added_time,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_transaction() {
        let history = TransactionHistory::new();
        let hash = TxHash::repeat_byte(0xab);

        history.add_transaction(hash, "Swap 1 ETH for 1800 USDC".to_string());
        history.add_transaction(hash, "duplicate".to_string());

        assert_eq!(history.transactions().len(), 1);
        assert_eq!(
            history.get(hash).map(|details| details.summary),
            Some("Swap 1 ETH for 1800 USDC".to_string())
        );
        assert_eq!(history.get(TxHash::zero()), None);
    }
}
