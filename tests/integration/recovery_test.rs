// Restart-recovery tests: a "crash" is simulated by dropping every manager
// and rebuilding the stack over the same data directory.

use anyhow::Result;
use tempfile::TempDir;

use ferrodb::{BlockId, DbConfig, FerroDB};

fn config_for(dir: &TempDir) -> DbConfig {
    DbConfig {
        db_dir: dir.path().join("db"),
        pool_size: 4,
        ..DbConfig::default()
    }
}

#[test]
fn test_recover_undoes_uncommitted_writes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let blk = BlockId::new("testfile", 1);

    {
        let db = FerroDB::new(config_for(&dir))?;

        let mut setup = db.new_tx()?;
        setup.pin(&blk)?;
        setup.set_int(&blk, 80, 1, false)?;
        setup.set_string(&blk, 40, "one", false)?;
        setup.commit()?;

        // An in-flight transaction whose dirty pages get stolen to disk.
        let mut tx = db.new_tx()?;
        tx.pin(&blk)?;
        tx.set_int(&blk, 80, 999, true)?;
        tx.set_string(&blk, 40, "garbage", true)?;
        db.buffer_manager().flush_all(tx.tx_num())?;
        // Crash: no commit, no rollback.
    }

    let db = FerroDB::new(config_for(&dir))?;
    db.recover()?;

    let mut check = db.new_tx()?;
    check.pin(&blk)?;
    assert_eq!(check.get_int(&blk, 80)?, 1);
    assert_eq!(check.get_string(&blk, 40)?, "one");
    check.commit()?;
    Ok(())
}

#[test]
fn test_recover_preserves_committed_writes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let blk = BlockId::new("testfile", 0);

    {
        let db = FerroDB::new(config_for(&dir))?;
        let mut tx = db.new_tx()?;
        tx.pin(&blk)?;
        tx.set_int(&blk, 16, 7, false)?;
        tx.commit()?;

        let mut tx2 = db.new_tx()?;
        tx2.pin(&blk)?;
        tx2.set_int(&blk, 16, 8, true)?;
        tx2.commit()?;
    }

    let db = FerroDB::new(config_for(&dir))?;
    db.recover()?;

    let mut check = db.new_tx()?;
    check.pin(&blk)?;
    assert_eq!(check.get_int(&blk, 16)?, 8);
    check.commit()?;
    Ok(())
}

#[test]
fn test_recover_handles_mixed_outcomes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let blk = BlockId::new("testfile", 2);

    {
        let db = FerroDB::new(config_for(&dir))?;
        let mut setup = db.new_tx()?;
        setup.pin(&blk)?;
        setup.set_int(&blk, 0, 100, false)?;
        setup.set_int(&blk, 8, 200, false)?;
        setup.set_int(&blk, 16, 300, false)?;
        setup.commit()?;

        // Committed change at offset 0.
        let mut committed = db.new_tx()?;
        committed.pin(&blk)?;
        committed.set_int(&blk, 0, 101, true)?;
        committed.commit()?;

        // Rolled-back change at offset 8.
        let mut aborted = db.new_tx()?;
        aborted.pin(&blk)?;
        aborted.set_int(&blk, 8, 201, true)?;
        aborted.rollback()?;

        // In-flight change at offset 16, stolen to disk before the crash.
        let mut in_flight = db.new_tx()?;
        in_flight.pin(&blk)?;
        in_flight.set_int(&blk, 16, 301, true)?;
        db.buffer_manager().flush_all(in_flight.tx_num())?;
    }

    let db = FerroDB::new(config_for(&dir))?;
    db.recover()?;

    let mut check = db.new_tx()?;
    check.pin(&blk)?;
    assert_eq!(check.get_int(&blk, 0)?, 101);
    assert_eq!(check.get_int(&blk, 8)?, 200);
    assert_eq!(check.get_int(&blk, 16)?, 300);
    check.commit()?;
    Ok(())
}

#[test]
fn test_recover_is_idempotent() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let blk = BlockId::new("testfile", 3);

    {
        let db = FerroDB::new(config_for(&dir))?;
        let mut setup = db.new_tx()?;
        setup.pin(&blk)?;
        setup.set_int(&blk, 0, 5, false)?;
        setup.commit()?;

        let mut tx = db.new_tx()?;
        tx.pin(&blk)?;
        tx.set_int(&blk, 0, 6, true)?;
        db.buffer_manager().flush_all(tx.tx_num())?;
    }

    // First restart undoes the in-flight write and checkpoints.
    {
        let db = FerroDB::new(config_for(&dir))?;
        db.recover()?;
    }

    // A second restart stops at the checkpoint and changes nothing.
    let db = FerroDB::new(config_for(&dir))?;
    db.recover()?;

    let mut check = db.new_tx()?;
    check.pin(&blk)?;
    assert_eq!(check.get_int(&blk, 0)?, 5);
    check.commit()?;
    Ok(())
}
