use serde::{Deserialize, Serialize};

pub const DB_TYPE_MODIFY_BALANCE: i32 = 1;
pub const DB_TYPE_INCOME: i32 = 2;
pub const DB_TYPE_EXPENSE: i32 = 3;
pub const DB_TYPE_TRANSFER_OUT: i32 = 4;
pub const DB_TYPE_TRANSFER_IN: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
	Income,
	Expense,
	Transfer,
	/// Balance adjustments. Kept in the knowledge base, excluded from cash flow.
	Unknown,
}
impl TransactionType {
	/// Maps a stored transaction type. `None` means the record cannot be classified.
	pub fn from_db_type(db_type: i32) -> Option<Self> {
		match db_type {
			DB_TYPE_MODIFY_BALANCE => Some(Self::Unknown),
			DB_TYPE_INCOME => Some(Self::Income),
			DB_TYPE_EXPENSE => Some(Self::Expense),
			DB_TYPE_TRANSFER_OUT | DB_TYPE_TRANSFER_IN => Some(Self::Transfer),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Income => "income",
			Self::Expense => "expense",
			Self::Transfer => "transfer",
			Self::Unknown => "unknown",
		}
	}
}

/// One stored ledger row. Transfers are stored as two rows linked through `related_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
	pub transaction_id: i64,
	pub db_type: i32,
	#[serde(default)]
	pub related_id: i64,
	pub account_id: i64,
	#[serde(default)]
	pub related_account_id: i64,
	/// Minor units of the source account's currency.
	pub amount: i64,
	#[serde(default)]
	pub related_account_amount: i64,
	#[serde(default)]
	pub category_id: i64,
	/// Unix seconds.
	pub time: i64,
	#[serde(default)]
	pub comment: String,
}
impl TransactionRecord {
	/// Returns the outbound leg of a transfer. Other records are returned unchanged.
	pub fn outbound_leg(&self) -> Self {
		if self.db_type != DB_TYPE_TRANSFER_IN {
			return self.clone();
		}

		Self {
			transaction_id: self.related_id,
			db_type: DB_TYPE_TRANSFER_OUT,
			related_id: self.transaction_id,
			account_id: self.related_account_id,
			related_account_id: self.account_id,
			amount: self.related_account_amount,
			related_account_amount: self.amount,
			category_id: self.category_id,
			time: self.time,
			comment: self.comment.clone(),
		}
	}

	/// Id the economic transaction is known by, which is the outbound leg's id for transfers.
	pub fn knowledge_id(&self) -> i64 {
		if self.db_type == DB_TYPE_TRANSFER_IN { self.related_id } else { self.transaction_id }
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	pub id: i64,
	pub name: String,
	#[serde(default)]
	pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
	pub id: i64,
	pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
	pub id: i64,
	pub name: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn transfer_in() -> TransactionRecord {
		TransactionRecord {
			transaction_id: 11,
			db_type: DB_TYPE_TRANSFER_IN,
			related_id: 10,
			account_id: 2,
			related_account_id: 1,
			amount: 1_800,
			related_account_amount: 2_000,
			category_id: 7,
			time: 1_700_000_000,
			comment: "rebalance".to_string(),
		}
	}

	#[test]
	fn transfer_in_collapses_to_outbound_leg() {
		let leg = transfer_in().outbound_leg();

		assert_eq!(leg.transaction_id, 10);
		assert_eq!(leg.db_type, DB_TYPE_TRANSFER_OUT);
		assert_eq!(leg.account_id, 1);
		assert_eq!(leg.related_account_id, 2);
		assert_eq!(leg.amount, 2_000);
		assert_eq!(leg.related_account_amount, 1_800);
		assert_eq!(transfer_in().knowledge_id(), 10);
	}

	#[test]
	fn unclassifiable_db_types_map_to_none() {
		assert_eq!(TransactionType::from_db_type(1), Some(TransactionType::Unknown));
		assert_eq!(TransactionType::from_db_type(5), Some(TransactionType::Transfer));
		assert_eq!(TransactionType::from_db_type(0), None);
		assert_eq!(TransactionType::from_db_type(9), None);
	}
}
