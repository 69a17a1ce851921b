use anyhow::Result;

use ferrodb::{BlockId, DbConfig, FerroDB};

fn main() -> Result<()> {
    let db = FerroDB::new(DbConfig {
        db_dir: "tx_demo".into(),
        pool_size: 3,
        ..DbConfig::default()
    })?;

    let blk = BlockId::new("demofile", 1);

    // Initial values: freshly allocated space carries no meaning yet, so
    // these writes skip logging.
    let mut tx1 = db.new_tx()?;
    tx1.pin(&blk)?;
    tx1.set_int(&blk, 80, 1, false)?;
    tx1.set_string(&blk, 40, "one", false)?;
    tx1.commit()?;

    let mut tx2 = db.new_tx()?;
    tx2.pin(&blk)?;
    let ival = tx2.get_int(&blk, 80)?;
    let sval = tx2.get_string(&blk, 40)?;
    println!("initial value at offset 80 = {ival}");
    println!("initial value at offset 40 = {sval}");
    tx2.set_int(&blk, 80, ival + 1, true)?;
    tx2.set_string(&blk, 40, &format!("{sval}!"), true)?;
    tx2.commit()?;

    let mut tx3 = db.new_tx()?;
    tx3.pin(&blk)?;
    println!("new value at offset 80 = {}", tx3.get_int(&blk, 80)?);
    println!("new value at offset 40 = {}", tx3.get_string(&blk, 40)?);
    tx3.set_int(&blk, 80, 999, true)?;
    println!("pre-rollback value at offset 80 = {}", tx3.get_int(&blk, 80)?);
    tx3.rollback()?;

    let mut tx4 = db.new_tx()?;
    tx4.pin(&blk)?;
    println!("post-rollback value at offset 80 = {}", tx4.get_int(&blk, 80)?);
    tx4.commit()?;

    Ok(())
}
