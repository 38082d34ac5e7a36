mod calendar;
mod cli;
mod clock;
mod constants;
mod domain;
mod ledger;
mod reset;
mod storage;
mod streak;

fn main() {
    cli::run_cli();
}
