use crate::db::{DynError, LiveQuery, MedicineDb};
use crate::medicine::Medicine;

/// Access point for medicine data used by presentation code.
/// Forwards to the store without adding caching or rules of its own.
#[derive(Clone)]
pub struct MedicineRepository {
    db: MedicineDb,
}

impl MedicineRepository {
    pub fn new(db: MedicineDb) -> Self {
        Self { db }
    }

    /// Live sequence of every medicine, straight from the store
    pub fn get_all_medicines(&self) -> LiveQuery {
        self.db.query_all()
    }

    pub async fn insert_medicine(&self, medicine: &Medicine) -> Result<i64, DynError> {
        self.db.insert(medicine).await
    }

    pub async fn delete_medicine(&self, medicine: &Medicine) -> Result<u64, DynError> {
        self.db.delete(medicine).await
    }
}
