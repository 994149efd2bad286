extern crate clap;

use clap::{App, Arg};
use crossfill::{parse_word_list, render_solution, Puzzle, SolveFailure, Solver};
use std::fs;

fn main() -> Result<(), String> {
    env_logger::init();

    let matches = App::new("crossfill")
        .about("Fill a crossword grid template from a word list")
        .arg(
            Arg::with_name("structure")
                .value_name("STRUCTURE")
                .help("Grid template file, with `#` for blocked cells and `.` or `_` for fillable cells")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("words")
                .value_name("WORDS")
                .help("Word list file, one candidate per line")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("output")
                .value_name("OUTPUT")
                .help("Also write the filled grid to this file")
                .index(3),
        )
        .arg(
            Arg::with_name("states")
                .long("states")
                .value_name("N")
                .help("Give up after visiting N search states"),
        )
        .get_matches();

    let structure = matches.value_of("structure").expect("structure not included");
    let structure = fs::read_to_string(structure).expect("failed to read grid template");

    let words = matches.value_of("words").expect("words not included");
    let words = parse_word_list(&fs::read_to_string(words).expect("failed to read word list"));

    let puzzle = Puzzle::from_template_string(&structure, &words);

    let mut solver = Solver::new(&puzzle);
    if let Some(states) = matches.value_of("states") {
        let states = states.parse().expect("failed to parse state limit");
        solver = solver.with_state_limit(states);
    }

    match solver.solve() {
        Ok(solution) => {
            let rendered = render_solution(&puzzle, &solution.choices);

            println!("{:?}", solution.statistics);
            println!("{}", rendered);

            if let Some(output) = matches.value_of("output") {
                fs::write(output, rendered).expect("unable to write output file");
            }
            Ok(())
        }
        Err(SolveFailure::Unsatisfiable) => {
            println!("No solution.");
            Ok(())
        }
        Err(SolveFailure::StateLimitExceeded) => {
            Err(String::from("Gave up after hitting the state limit"))
        }
    }
}
