// End-to-end WAL checks: transactions leave decodable before-image records
// in reverse chronological order.

use anyhow::Result;
use tempfile::TempDir;

use ferrodb::{BlockId, DbConfig, FerroDB, LogRecord, LogRecordType};

fn setup_db() -> Result<(FerroDB, TempDir)> {
    let dir = tempfile::tempdir()?;
    let db = FerroDB::new(DbConfig {
        db_dir: dir.path().join("db"),
        pool_size: 3,
        ..DbConfig::default()
    })?;
    Ok((db, dir))
}

fn read_log(db: &FerroDB) -> Result<Vec<LogRecord>> {
    let mut records = Vec::new();
    for bytes in db.log_manager().iterator()? {
        records.push(LogRecord::decode(&bytes?)?);
    }
    Ok(records)
}

#[test]
fn test_committed_transaction_log_shape() -> Result<()> {
    let (db, _dir) = setup_db()?;
    let blk = BlockId::new("testfile", 1);

    let mut tx = db.new_tx()?;
    let tx_num = tx.tx_num();
    tx.pin(&blk)?;
    tx.set_int(&blk, 80, 1, false)?;
    tx.commit()?;

    let mut tx2 = db.new_tx()?;
    let tx2_num = tx2.tx_num();
    tx2.pin(&blk)?;
    tx2.set_int(&blk, 80, 2, true)?;
    tx2.commit()?;

    // Newest-first: tx2's COMMIT, its before-image, its START, then tx1.
    let records = read_log(&db)?;
    assert_eq!(records[0], LogRecord::Commit { tx_num: tx2_num });
    assert_eq!(
        records[1],
        LogRecord::SetInt {
            tx_num: tx2_num,
            blk: blk.clone(),
            offset: 80,
            old_val: 1,
        }
    );
    assert_eq!(records[2], LogRecord::Start { tx_num: tx2_num });
    assert_eq!(records[3], LogRecord::Commit { tx_num });
    assert_eq!(records[4], LogRecord::Start { tx_num });
    Ok(())
}

#[test]
fn test_unlogged_writes_leave_no_before_images() -> Result<()> {
    let (db, _dir) = setup_db()?;
    let blk = BlockId::new("testfile", 0);

    let mut tx = db.new_tx()?;
    tx.pin(&blk)?;
    tx.set_int(&blk, 0, 42, false)?;
    tx.set_string(&blk, 8, "init", false)?;
    tx.commit()?;

    let records = read_log(&db)?;
    assert!(
        records
            .iter()
            .all(|r| !matches!(r.op(), LogRecordType::SetInt | LogRecordType::SetString))
    );
    Ok(())
}

#[test]
fn test_set_string_records_capture_old_value() -> Result<()> {
    let (db, _dir) = setup_db()?;
    let blk = BlockId::new("testfile", 4);

    let mut tx = db.new_tx()?;
    tx.pin(&blk)?;
    tx.set_string(&blk, 33, "apple", false)?;
    tx.set_string(&blk, 33, "joe", true)?;
    tx.set_string(&blk, 33, "pear", true)?;
    tx.commit()?;

    let records = read_log(&db)?;
    let old_values: Vec<_> = records
        .iter()
        .filter_map(|r| match r {
            LogRecord::SetString { old_val, .. } => Some(old_val.clone()),
            _ => None,
        })
        .collect();
    // Newest first: the write of "pear" captured "joe", which captured
    // "apple".
    assert_eq!(old_values, vec!["joe".to_string(), "apple".to_string()]);
    Ok(())
}

#[test]
fn test_rollback_record_terminates_transaction() -> Result<()> {
    let (db, _dir) = setup_db()?;
    let blk = BlockId::new("testfile", 6);

    let mut tx = db.new_tx()?;
    let tx_num = tx.tx_num();
    tx.pin(&blk)?;
    tx.set_int(&blk, 0, 1, true)?;
    tx.rollback()?;

    let records = read_log(&db)?;
    assert_eq!(records[0], LogRecord::Rollback { tx_num });
    Ok(())
}
