use std::error::Error;
use std::io;

use traceback::{FuncSpec, SymbolTable};

#[inline(never)]
fn gamma(table: &SymbolTable) {
    let mut stdout = io::stdout();
    if let Err(e) = traceback::trace(table, &mut stdout) {
        eprintln!("traceback failed: {e}");
    }
}

#[inline(never)]
fn beta(table: &SymbolTable) {
    gamma(table);
    // prevent this frame from being tail-call optimised away
    std::hint::black_box(());
}

#[inline(never)]
fn alpha(table: &SymbolTable) {
    beta(table);
    std::hint::black_box(());
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    println!("traceback v0.1.0 - in-process stack traceback demo");
    println!("Frames outside the demo chain have no registered symbols and print as raw addresses.");
    println!();

    // Register the demo chain under its runtime addresses; a real embedding
    // would load a table produced by an external symbol generator.
    let table = SymbolTable::build(vec![
        FuncSpec::new("alpha", alpha as fn(&SymbolTable) as usize, vec![]),
        FuncSpec::new("beta", beta as fn(&SymbolTable) as usize, vec![]),
        FuncSpec::new("gamma", gamma as fn(&SymbolTable) as usize, vec![]),
    ])?;

    alpha(&table);
    Ok(())
}
