// Buffer pool behavior observed through the full stack: pin accounting
// across transactions and exhaustion under too many concurrent pins.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use ferrodb::{
    BlockId, BufferError, BufferManager, FileManager, LogManager, Transaction, TransactionError,
};

fn setup_stack(
    pool_size: usize,
    max_wait: Duration,
) -> Result<(
    Arc<FileManager>,
    Arc<LogManager>,
    Arc<BufferManager>,
    TempDir,
)> {
    let dir = tempfile::tempdir()?;
    let fm = Arc::new(FileManager::new(dir.path().join("db"), 400)?);
    let lm = Arc::new(LogManager::new(fm.clone(), "logfile")?);
    let bm = Arc::new(BufferManager::with_max_wait(
        fm.clone(),
        lm.clone(),
        pool_size,
        max_wait,
    ));
    Ok((fm, lm, bm, dir))
}

#[test]
fn test_available_buffers_tracks_transaction_pins() -> Result<()> {
    let (fm, lm, bm, _dir) = setup_stack(3, Duration::from_millis(50))?;
    let mut tx = Transaction::new(fm, lm, bm)?;
    assert_eq!(tx.available_buffers(), 3);

    let blk0 = BlockId::new("testfile", 0);
    let blk1 = BlockId::new("testfile", 1);
    tx.pin(&blk0)?;
    assert_eq!(tx.available_buffers(), 2);
    tx.pin(&blk1)?;
    assert_eq!(tx.available_buffers(), 1);

    // Re-pinning an already-pinned block reuses the frame.
    tx.pin(&blk0)?;
    assert_eq!(tx.available_buffers(), 1);
    tx.unpin(&blk0);
    assert_eq!(tx.available_buffers(), 1);
    tx.unpin(&blk0);
    assert_eq!(tx.available_buffers(), 2);

    tx.commit()?;
    assert_eq!(tx.available_buffers(), 3);
    Ok(())
}

#[test]
fn test_pin_exhaustion_surfaces_buffer_error() -> Result<()> {
    let (fm, lm, bm, _dir) = setup_stack(2, Duration::from_millis(50))?;
    let mut tx1 = Transaction::new(fm.clone(), lm.clone(), bm.clone())?;
    tx1.pin(&BlockId::new("testfile", 0))?;
    tx1.pin(&BlockId::new("testfile", 1))?;

    let mut tx2 = Transaction::new(fm, lm, bm)?;
    match tx2.pin(&BlockId::new("testfile", 2)) {
        Err(TransactionError::Buffer(BufferError::NoAvailableBuffer)) => {}
        other => panic!("expected NoAvailableBuffer, got {:?}", other),
    }

    // Releasing a pin lets the starved transaction proceed.
    tx1.unpin(&BlockId::new("testfile", 0));
    tx2.pin(&BlockId::new("testfile", 2))?;
    tx1.commit()?;
    tx2.commit()?;
    Ok(())
}

#[test]
fn test_concurrent_transactions_share_the_pool() -> Result<()> {
    let (fm, lm, bm, _dir) = setup_stack(8, Duration::from_secs(2))?;
    {
        let mut setup = Transaction::new(fm.clone(), lm.clone(), bm.clone())?;
        let blk = BlockId::new("testfile", 0);
        setup.pin(&blk)?;
        setup.set_int(&blk, 0, 0, false)?;
        setup.commit()?;
    }

    let mut handles = Vec::new();
    for i in 0..4u64 {
        let (fm, lm, bm) = (fm.clone(), lm.clone(), bm.clone());
        handles.push(std::thread::spawn(move || -> Result<()> {
            let blk = BlockId::new("testfile", 0);
            let mut tx = Transaction::new(fm, lm, bm)?;
            tx.pin(&blk)?;
            tx.set_int(&blk, (8 + i * 8) as usize, i + 1, true)?;
            tx.commit()?;
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().expect("worker thread panicked")?;
    }

    let mut check = Transaction::new(fm, lm, bm)?;
    let blk = BlockId::new("testfile", 0);
    check.pin(&blk)?;
    for i in 0..4u64 {
        assert_eq!(check.get_int(&blk, (8 + i * 8) as usize)?, i + 1);
    }
    check.commit()?;
    Ok(())
}
