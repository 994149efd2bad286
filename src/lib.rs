use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{Debug, Formatter};

use bit_set::BitSet;
use instant::{Duration, Instant};
use log::{debug, info};
use smallvec::{smallvec, SmallVec};

/// The expected maximum number of slots appearing in a grid.
pub const MAX_SLOT_COUNT: usize = 256;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// An identifier for a given slot, based on its index in the puzzle's `slots` field.
pub type SlotId = usize;

/// An identifier for a given word, based on its index in the puzzle's vocabulary.
pub type WordId = usize;

/// Zero-indexed (row, column) coords for a cell in the grid, where row 0 is the top row.
type GridCoord = (usize, usize);

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Across,
    Down,
}

/// A vocabulary entry that can be chosen for a slot.
#[derive(Debug, Clone)]
pub struct Word {
    pub string: String,
    pub letters: SmallVec<[char; MAX_SLOT_LENGTH]>,
}

/// A struct representing a crossing between one slot and another, referencing the other slot's
/// id and the location of the shared cell within the other slot's word.
#[derive(Debug, Clone, Copy)]
pub struct Crossing {
    pub other_slot: SlotId,
    pub other_cell: usize,
}

/// A maximal run of two or more fillable cells in one direction; the unit that words are
/// assigned to.
#[derive(Debug)]
pub struct Slot {
    pub id: SlotId,
    pub start: GridCoord,
    pub direction: Direction,
    pub length: usize,
    pub crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]>,
}

impl Slot {
    /// Generate the coords for each cell of this slot.
    fn cell_coords(&self) -> Vec<GridCoord> {
        let (row, col) = self.start;
        (0..self.length)
            .map(|cell_idx| match self.direction {
                Direction::Across => (row, col + cell_idx),
                Direction::Down => (row + cell_idx, col),
            })
            .collect()
    }
}

/// Parse a word list with one candidate per line. Entries are trimmed, uppercased, and
/// deduplicated; input order is otherwise preserved.
pub fn parse_word_list(text: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut words: Vec<String> = vec![];

    for line in text.lines() {
        let word = line.trim().to_uppercase();
        if word.is_empty() {
            continue;
        }
        if seen.insert(word.clone()) {
            words.push(word);
        }
    }

    words
}

/// An immutable description of a grid and its candidate vocabulary: dimensions, which cells are
/// fillable, the slots derived from them, and the precomputed crossings between slots.
pub struct Puzzle {
    pub width: usize,
    pub height: usize,
    open: Vec<bool>,
    slots: SmallVec<[Slot; MAX_SLOT_COUNT]>,
    words: Vec<Word>,
}

impl Debug for Puzzle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Puzzle")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("slots", &self.slots)
            .field(
                "words",
                &(["(", &self.words.len().to_string(), " entries)"].join("")),
            )
            .finish()
    }
}

impl Puzzle {
    /// Build a puzzle from a grid template string, with `#` representing blocked cells and `.`
    /// (or `_`) representing fillable cells. Every run of two or more fillable cells in a row
    /// or column becomes a slot; a lone fillable cell belongs to no slot.
    pub fn from_template_string(template: &str, word_list: &[String]) -> Puzzle {
        let rows: Vec<Vec<char>> = template
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    None
                } else {
                    Some(line.chars().collect())
                }
            })
            .collect();

        if rows.is_empty() {
            panic!("Empty grid template");
        }
        let height = rows.len();
        let width = rows[0].len();

        let mut open = vec![false; width * height];
        for (row, line) in rows.iter().enumerate() {
            if line.len() != width {
                panic!("Ragged grid template");
            }
            for (col, &cell) in line.iter().enumerate() {
                open[row * width + col] = match cell {
                    '.' | '_' => true,
                    '#' => false,
                    other => panic!("Unexpected character {:?} in grid template", other),
                };
            }
        }

        // Across slots come first in row-major order, then down slots in column-major order;
        // slot ids are indices into this list.
        let mut slots: SmallVec<[Slot; MAX_SLOT_COUNT]> = smallvec![];

        for row in 0..height {
            let mut run: Option<(GridCoord, usize)> = None;
            for col in 0..=width {
                let is_open = col < width && open[row * width + col];
                if is_open {
                    run = match run {
                        Some((start, length)) => Some((start, length + 1)),
                        None => Some(((row, col), 1)),
                    };
                } else if let Some((start, length)) = run.take() {
                    if length >= 2 {
                        slots.push(Slot {
                            id: slots.len(),
                            start,
                            direction: Direction::Across,
                            length,
                            crossings: smallvec![],
                        });
                    }
                }
            }
        }

        for col in 0..width {
            let mut run: Option<(GridCoord, usize)> = None;
            for row in 0..=height {
                let is_open = row < height && open[row * width + col];
                if is_open {
                    run = match run {
                        Some((start, length)) => Some((start, length + 1)),
                        None => Some(((row, col), 1)),
                    };
                } else if let Some((start, length)) = run.take() {
                    if length >= 2 {
                        slots.push(Slot {
                            id: slots.len(),
                            start,
                            direction: Direction::Down,
                            length,
                            crossings: smallvec![],
                        });
                    }
                }
            }
        }

        // Build a map from cell location to the slots involved, which we can then use to fill
        // in each slot's crossing table. A cell holds at most one across and one down slot,
        // since runs within a direction are maximal and disjoint.
        let mut entries_by_cell: HashMap<GridCoord, Vec<(SlotId, usize)>> = HashMap::new();
        for slot in &slots {
            for (cell_idx, loc) in slot.cell_coords().into_iter().enumerate() {
                entries_by_cell
                    .entry(loc)
                    .or_insert_with(Vec::new)
                    .push((slot.id, cell_idx));
            }
        }

        for slot_id in 0..slots.len() {
            let coords = slots[slot_id].cell_coords();
            let crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]> = coords
                .iter()
                .map(|loc| {
                    entries_by_cell[loc]
                        .iter()
                        .find(|&&(other, _)| other != slot_id)
                        .map(|&(other_slot, other_cell)| Crossing {
                            other_slot,
                            other_cell,
                        })
                })
                .collect();
            slots[slot_id].crossings = crossings;
        }

        let words: Vec<Word> = word_list
            .iter()
            .map(|word| Word {
                string: word.clone(),
                letters: word.chars().collect(),
            })
            .collect();

        Puzzle {
            width,
            height,
            open,
            slots,
            words,
        }
    }

    /// All slots derived from the grid.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// The global candidate vocabulary, shared by every slot.
    pub fn vocabulary(&self) -> &[Word] {
        &self.words
    }

    /// The in-word offsets at which `x` and `y` share a cell, if they cross. Symmetric:
    /// swapping the arguments swaps the offsets. Slots with the same direction never cross.
    pub fn overlap(&self, x: SlotId, y: SlotId) -> Option<(usize, usize)> {
        self.slots[x]
            .crossings
            .iter()
            .enumerate()
            .find_map(|(cell_idx, crossing)| match crossing {
                Some(crossing) if crossing.other_slot == y => {
                    Some((cell_idx, crossing.other_cell))
                }
                _ => None,
            })
    }

    /// Ids of every slot crossing `x`.
    pub fn neighbors(&self, x: SlotId) -> SmallVec<[SlotId; MAX_SLOT_LENGTH]> {
        self.slots[x]
            .crossings
            .iter()
            .flatten()
            .map(|crossing| crossing.other_slot)
            .collect()
    }

    fn is_open(&self, row: usize, col: usize) -> bool {
        self.open[row * self.width + col]
    }
}

/// A struct recording a slot assignment made during the solving process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// Turn the given puzzle and solve choices into a rendered letter grid, with `█` for blocked
/// cells and a space for any fillable cell no choice covers.
pub fn render_solution(puzzle: &Puzzle, choices: &[Choice]) -> String {
    let mut letters: Vec<Option<char>> = vec![None; puzzle.width * puzzle.height];

    for &Choice { slot_id, word_id } in choices {
        let slot = &puzzle.slots[slot_id];
        let word = &puzzle.words[word_id];
        for (cell_idx, (row, col)) in slot.cell_coords().into_iter().enumerate() {
            letters[row * puzzle.width + col] = Some(word.letters[cell_idx]);
        }
    }

    let mut grid = String::new();
    for row in 0..puzzle.height {
        if row > 0 {
            grid.push('\n');
        }
        for col in 0..puzzle.width {
            if puzzle.is_open(row, col) {
                grid.push(letters[row * puzzle.width + col].unwrap_or(' '));
            } else {
                grid.push('█');
            }
        }
    }

    grid
}

/// A struct tracking statistics about the solving process.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub state_limit: Option<u64>,
    pub states: u64,
    pub backtracks: u64,
    pub revisions: u64,
    pub duration: Duration,
}

/// Terminal outcomes of a solve that produce no assignment. Both are ordinary results rather
/// than errors: an unsatisfiable puzzle is a valid answer to the question being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveFailure {
    Unsatisfiable,
    StateLimitExceeded,
}

/// A struct representing the results of a successful solve: one choice per slot, plus
/// statistics about the search that produced them.
#[derive(Debug)]
pub struct Solution {
    pub choices: Vec<Choice>,
    pub statistics: Statistics,
}

/// The state of a single solving session: the per-slot candidate domains, the undo trail that
/// lets search roll domain prunes back, and the partial assignment being extended.
pub struct Solver<'a> {
    puzzle: &'a Puzzle,
    domains: Vec<BitSet>,
    trail: Vec<(SlotId, WordId)>,
    assignment: Vec<Option<WordId>>,
    state_limit: Option<u64>,
    statistics: Statistics,
}

impl<'a> Solver<'a> {
    /// Create a solver with fresh full-vocabulary domains for every slot.
    pub fn new(puzzle: &'a Puzzle) -> Solver<'a> {
        let full_domain: BitSet = (0..puzzle.words.len()).collect();

        Solver {
            puzzle,
            domains: puzzle.slots.iter().map(|_| full_domain.clone()).collect(),
            trail: vec![],
            assignment: vec![None; puzzle.slots.len()],
            state_limit: None,
            statistics: Statistics {
                state_limit: None,
                states: 0,
                backtracks: 0,
                revisions: 0,
                duration: Duration::from_millis(0),
            },
        }
    }

    /// Abort the search with `StateLimitExceeded` once it has visited this many states.
    pub fn with_state_limit(mut self, state_limit: u64) -> Solver<'a> {
        self.state_limit = Some(state_limit);
        self.statistics.state_limit = Some(state_limit);
        self
    }

    /// Remove a candidate from a slot's domain, recording the removal so that it can be undone
    /// when the search unwinds past it.
    fn remove_candidate(&mut self, slot_id: SlotId, word_id: WordId) {
        self.domains[slot_id].remove(word_id);
        self.trail.push((slot_id, word_id));
    }

    /// Reinsert every removal recorded after `mark`, most recent first.
    fn rollback(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let (slot_id, word_id) = self.trail.pop().unwrap();
            self.domains[slot_id].insert(word_id);
        }
    }

    /// Remove every candidate whose letter count differs from its slot's length. One pass is
    /// enough: length is a property of the word alone, so there is nothing to propagate.
    fn enforce_node_consistency(&mut self) {
        let mut removed = 0u64;

        for slot_id in 0..self.puzzle.slots.len() {
            let length = self.puzzle.slots[slot_id].length;
            let misfits: Vec<WordId> = self.domains[slot_id]
                .iter()
                .filter(|&word_id| self.puzzle.words[word_id].letters.len() != length)
                .collect();
            for word_id in misfits {
                self.remove_candidate(slot_id, word_id);
                removed += 1;
            }
        }

        debug!("node consistency removed {} candidates", removed);
    }

    /// Make `x` arc-consistent with `y`: remove from x's domain every word with no supporting
    /// word in y's domain at the shared cell. Returns true iff at least one removal occurred;
    /// a no-op (including the non-crossing case) returns false.
    fn revise(&mut self, x: SlotId, y: SlotId) -> bool {
        let Some((offset_x, offset_y)) = self.puzzle.overlap(x, y) else {
            return false;
        };
        self.statistics.revisions += 1;

        let unsupported: Vec<WordId> = self.domains[x]
            .iter()
            .filter(|&word_x| {
                let letter_x = self.puzzle.words[word_x].letters[offset_x];
                !self.domains[y]
                    .iter()
                    .any(|word_y| self.puzzle.words[word_y].letters[offset_y] == letter_x)
            })
            .collect();

        let revised = !unsupported.is_empty();
        for word_x in unsupported {
            self.remove_candidate(x, word_x);
        }

        revised
    }

    /// Propagate crossing constraints to a fixpoint with AC-3. `initial_arcs` seeds the work
    /// queue; `None` means every ordered arc in the puzzle (each crossing is recorded on both
    /// slots, so both directions of every pair are seeded). Returns false iff some domain is,
    /// or becomes, empty, which makes the puzzle unsatisfiable.
    fn ac3(&mut self, initial_arcs: Option<Vec<(SlotId, SlotId)>>) -> bool {
        if self.domains.iter().any(|domain| domain.is_empty()) {
            return false;
        }

        let mut arcs: VecDeque<(SlotId, SlotId)> = match initial_arcs {
            Some(arcs) => arcs.into(),
            None => self
                .puzzle
                .slots
                .iter()
                .flat_map(|slot| {
                    slot.crossings
                        .iter()
                        .flatten()
                        .map(|crossing| (slot.id, crossing.other_slot))
                })
                .collect(),
        };

        while let Some((x, y)) = arcs.pop_front() {
            if self.revise(x, y) {
                if self.domains[x].is_empty() {
                    debug!("domain of slot {} wiped out while revising against {}", x, y);
                    return false;
                }

                // x shrank, so every arc pointing at x may prune again. Re-enqueueing (y, x)
                // would be redundant; the comparison is on slot ids, never grid positions.
                for z in self.puzzle.neighbors(x) {
                    if z != y {
                        arcs.push_back((z, x));
                    }
                }
            }
        }

        true
    }

    /// Is the current partial assignment consistent? Every assigned word must fit its slot's
    /// length, no word may be used twice, and assigned crossing slots must agree on the letter
    /// in their shared cell.
    fn consistent(&self) -> bool {
        let assigned: Vec<(SlotId, WordId)> = self
            .assignment
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word_id)| word_id.map(|word_id| (slot_id, word_id)))
            .collect();

        for (i, &(slot_x, word_x)) in assigned.iter().enumerate() {
            if self.puzzle.words[word_x].letters.len() != self.puzzle.slots[slot_x].length {
                return false;
            }

            for &(slot_y, word_y) in &assigned[i + 1..] {
                if word_x == word_y {
                    return false;
                }
                if let Some((offset_x, offset_y)) = self.puzzle.overlap(slot_x, slot_y) {
                    if self.puzzle.words[word_x].letters[offset_x]
                        != self.puzzle.words[word_y].letters[offset_y]
                    {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Choose the next slot to fill: fewest remaining candidates, ties broken by highest
    /// degree, remaining ties by lowest slot id so that runs are reproducible.
    fn select_unassigned_variable(&self) -> Option<SlotId> {
        (0..self.puzzle.slots.len())
            .filter(|&slot_id| self.assignment[slot_id].is_none())
            .min_by_key(|&slot_id| {
                (
                    self.domains[slot_id].len(),
                    Reverse(self.puzzle.neighbors(slot_id).len()),
                    slot_id,
                )
            })
    }

    /// Order a slot's remaining candidates by the number of options they would eliminate from
    /// unassigned crossing slots, least constraining first. A crossing option counts as
    /// eliminated if it disagrees on the shared cell or is the identical word. Ties fall back
    /// to word id.
    fn order_domain_values(&self, var: SlotId) -> Vec<WordId> {
        let unassigned_neighbors: SmallVec<[SlotId; MAX_SLOT_LENGTH]> = self
            .puzzle
            .neighbors(var)
            .into_iter()
            .filter(|&neighbor| self.assignment[neighbor].is_none())
            .collect();

        let mut candidates: Vec<WordId> = self.domains[var].iter().collect();
        candidates.sort_by_cached_key(|&word_var| {
            let eliminated: usize = unassigned_neighbors
                .iter()
                .map(|&neighbor| {
                    // A neighbor always has an overlap with `var`.
                    let (offset_var, offset_neighbor) =
                        self.puzzle.overlap(var, neighbor).unwrap();
                    let letter_var = self.puzzle.words[word_var].letters[offset_var];

                    self.domains[neighbor]
                        .iter()
                        .filter(|&word_neighbor| {
                            word_neighbor == word_var
                                || self.puzzle.words[word_neighbor].letters[offset_neighbor]
                                    != letter_var
                        })
                        .count()
                })
                .sum();

            (eliminated, word_var)
        });

        candidates
    }

    /// Restrict `var`'s domain to the chosen word and propagate the restriction to its
    /// crossing slots (maintaining arc consistency). Returns false if propagation wipes out
    /// some domain, in which case the caller should roll back and try another value.
    fn propagate_assignment(&mut self, var: SlotId, choice: WordId) -> bool {
        let others: Vec<WordId> = self.domains[var]
            .iter()
            .filter(|&word_id| word_id != choice)
            .collect();
        for word_id in others {
            self.remove_candidate(var, word_id);
        }

        let arcs: Vec<(SlotId, SlotId)> = self
            .puzzle
            .neighbors(var)
            .into_iter()
            .map(|neighbor| (neighbor, var))
            .collect();
        self.ac3(Some(arcs))
    }

    /// Depth-first search over partial assignments. `Ok(true)` means the assignment is now
    /// complete; `Ok(false)` means this branch is exhausted. Every tentative extension is
    /// undone before the branch returns, whatever the outcome.
    fn backtrack(&mut self) -> Result<bool, SolveFailure> {
        if let Some(limit) = self.state_limit {
            if self.statistics.states >= limit {
                return Err(SolveFailure::StateLimitExceeded);
            }
        }
        self.statistics.states += 1;

        let Some(var) = self.select_unassigned_variable() else {
            return Ok(true);
        };

        for word_id in self.order_domain_values(var) {
            self.assignment[var] = Some(word_id);
            if self.consistent() {
                let mark = self.trail.len();
                if self.propagate_assignment(var, word_id) && self.backtrack()? {
                    return Ok(true);
                }
                self.rollback(mark);
            }
            self.assignment[var] = None;
            self.statistics.backtracks += 1;
        }

        Ok(false)
    }

    /// Enforce node and arc consistency, then search for a complete assignment. Consumes the
    /// solver: a from-scratch solve always starts from fresh domains.
    pub fn solve(mut self) -> Result<Solution, SolveFailure> {
        let start = Instant::now();

        self.enforce_node_consistency();
        if !self.ac3(None) {
            return Err(SolveFailure::Unsatisfiable);
        }
        if !self.backtrack()? {
            return Err(SolveFailure::Unsatisfiable);
        }

        self.statistics.duration = start.elapsed();
        info!(
            "filled {} slots in {} states ({} backtracks, {} revisions, {:?})",
            self.puzzle.slots.len(),
            self.statistics.states,
            self.statistics.backtracks,
            self.statistics.revisions,
            self.statistics.duration
        );

        let choices = self
            .assignment
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word_id)| word_id.map(|word_id| Choice { slot_id, word_id }))
            .collect();

        Ok(Solution {
            choices,
            statistics: self.statistics,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        parse_word_list, render_solution, Choice, Direction, Puzzle, SolveFailure, Solver,
    };

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|word| word.to_string()).collect()
    }

    fn word_id(puzzle: &Puzzle, string: &str) -> usize {
        puzzle
            .vocabulary()
            .iter()
            .position(|word| word.string == string)
            .unwrap()
    }

    fn chosen_word<'a>(puzzle: &'a Puzzle, choices: &[Choice], slot_id: usize) -> &'a str {
        let choice = choices
            .iter()
            .find(|choice| choice.slot_id == slot_id)
            .unwrap();
        &puzzle.vocabulary()[choice.word_id].string
    }

    fn domain_strings(puzzle: &Puzzle, solver: &Solver, slot_id: usize) -> Vec<String> {
        solver.domains[slot_id]
            .iter()
            .map(|word_id| puzzle.vocabulary()[word_id].string.clone())
            .collect()
    }

    #[test]
    fn test_word_list_parsing() {
        let list = parse_word_list("cat\n\n  dog \nCAT\n");
        assert_eq!(list, vec!["CAT".to_string(), "DOG".to_string()]);
    }

    /// .#.
    /// ...
    /// .#.
    #[test]
    fn test_derives_slots_from_template() {
        let puzzle = Puzzle::from_template_string(".#.\n...\n.#.", &words(&["CAT"]));

        assert_eq!(puzzle.slots().len(), 3);

        let across = &puzzle.slots()[0];
        assert_eq!(across.direction, Direction::Across);
        assert_eq!(across.start, (1, 0));
        assert_eq!(across.length, 3);

        let down = &puzzle.slots()[1];
        assert_eq!(down.direction, Direction::Down);
        assert_eq!(down.start, (0, 0));
        assert_eq!(down.length, 3);
    }

    /// .#.
    /// ...
    /// .#.
    #[test]
    fn test_overlap_offsets_are_symmetric() {
        let puzzle = Puzzle::from_template_string(".#.\n...\n.#.", &words(&["CAT"]));

        assert_eq!(puzzle.overlap(0, 1), Some((0, 1)));
        assert_eq!(puzzle.overlap(1, 0), Some((1, 0)));
        assert_eq!(puzzle.overlap(0, 2), Some((2, 1)));
        assert_eq!(puzzle.overlap(2, 0), Some((1, 2)));

        // Parallel slots never cross.
        assert_eq!(puzzle.overlap(1, 2), None);

        assert_eq!(puzzle.neighbors(0).as_slice(), &[1, 2]);
        assert_eq!(puzzle.neighbors(1).as_slice(), &[0]);
    }

    #[test]
    fn test_node_consistency_filters_by_length() {
        let puzzle = Puzzle::from_template_string("...", &words(&["CAT", "CATS", "DOG"]));
        let mut solver = Solver::new(&puzzle);

        solver.enforce_node_consistency();

        assert_eq!(domain_strings(&puzzle, &solver, 0), vec!["CAT", "DOG"]);
        for word_id in solver.domains[0].iter() {
            assert_eq!(puzzle.vocabulary()[word_id].letters.len(), 3);
        }
    }

    /// ...#
    /// #.##
    /// #.##
    /// #.##
    #[test]
    fn test_revise_removes_unsupported_candidates() {
        let puzzle = Puzzle::from_template_string(
            "...#\n#.##\n#.##\n#.##",
            &words(&["CAT", "DOG", "CATS", "OATS"]),
        );
        let mut solver = Solver::new(&puzzle);
        solver.enforce_node_consistency();

        // "CATS" needs a three-letter candidate with C at offset 1 and there is none; "OATS"
        // is supported by "DOG".
        assert!(solver.revise(1, 0));
        assert_eq!(
            solver.domains[1].iter().collect::<Vec<_>>(),
            vec![word_id(&puzzle, "OATS")]
        );

        // A second pass over the same arc has nothing left to do.
        assert!(!solver.revise(1, 0));
    }

    /// ...#
    /// #.##
    /// #.##
    /// #.##
    #[test]
    fn test_solve_agrees_at_the_shared_cell() {
        let puzzle = Puzzle::from_template_string(
            "...#\n#.##\n#.##\n#.##",
            &words(&["CAT", "DOG", "CATS", "OATS"]),
        );

        let solution = Solver::new(&puzzle)
            .solve()
            .expect("Failed to fill the grid");

        assert_eq!(chosen_word(&puzzle, &solution.choices, 0), "DOG");
        assert_eq!(chosen_word(&puzzle, &solution.choices, 1), "OATS");
    }

    /// .#.
    /// ...
    /// .#.
    #[test]
    fn test_ac3_reaches_a_fixpoint() {
        let puzzle =
            Puzzle::from_template_string(".#.\n...\n.#.", &words(&["CAT", "DOG", "AGO", "ZIP"]));
        let mut solver = Solver::new(&puzzle);
        solver.enforce_node_consistency();

        assert!(solver.ac3(None));

        assert_eq!(domain_strings(&puzzle, &solver, 0), vec!["AGO"]);
        assert_eq!(domain_strings(&puzzle, &solver, 1), vec!["CAT"]);
        assert_eq!(domain_strings(&puzzle, &solver, 2), vec!["DOG"]);

        // Re-running revise on any arc after convergence must remove nothing.
        for x in 0..puzzle.slots().len() {
            for y in 0..puzzle.slots().len() {
                if x != y {
                    assert!(!solver.revise(x, y));
                }
            }
        }
    }

    /// ..
    /// .#
    #[test]
    fn test_empty_vocabulary_fails_arc_consistency() {
        let puzzle = Puzzle::from_template_string("..\n.#", &words(&[]));
        let mut solver = Solver::new(&puzzle);
        solver.enforce_node_consistency();

        assert!(!solver.ac3(None));
    }

    /// .#.
    /// ...
    /// .#.
    #[test]
    fn test_variable_selection_prefers_fewest_candidates() {
        let puzzle =
            Puzzle::from_template_string(".#.\n...\n.#.", &words(&["CAT", "DOG", "AGO"]));
        let mut solver = Solver::new(&puzzle);
        solver.enforce_node_consistency();

        // All domains are the same size, so the tie goes to the slot with the most crossings.
        assert_eq!(solver.select_unassigned_variable(), Some(0));

        // A strictly smaller domain wins outright.
        solver.remove_candidate(1, word_id(&puzzle, "CAT"));
        assert_eq!(solver.select_unassigned_variable(), Some(1));

        // Equal size and equal degree falls back to input order.
        solver.remove_candidate(2, word_id(&puzzle, "DOG"));
        assert_eq!(solver.select_unassigned_variable(), Some(1));
    }

    /// .#.
    /// ...
    /// .#.
    #[test]
    fn test_value_ordering_least_constraining_first() {
        let puzzle = Puzzle::from_template_string(
            ".#.\n...\n.#.",
            &words(&["ICE", "CAT", "AGO", "COT", "DIG"]),
        );
        let mut solver = Solver::new(&puzzle);
        solver.enforce_node_consistency();

        // "AGO" leaves "CAT" and "COT" alive in the two crossing slots; every other candidate
        // strands at least one crossing with no supported options at all.
        let order: Vec<&str> = solver
            .order_domain_values(0)
            .into_iter()
            .map(|word_id| puzzle.vocabulary()[word_id].string.as_str())
            .collect();
        assert_eq!(order, vec!["AGO", "ICE", "CAT", "COT", "DIG"]);
    }

    #[test]
    fn test_single_slot_puzzle() {
        let puzzle = Puzzle::from_template_string("...", &words(&["CAT", "DOG"]));

        let solution = Solver::new(&puzzle)
            .solve()
            .expect("Failed to fill the grid");

        assert_eq!(solution.choices.len(), 1);
        let filled = chosen_word(&puzzle, &solution.choices, 0);
        assert!(filled == "CAT" || filled == "DOG");
    }

    #[test]
    fn test_no_candidate_of_required_length() {
        let puzzle = Puzzle::from_template_string("...", &words(&["TOAD", "AT"]));

        assert!(matches!(
            Solver::new(&puzzle).solve(),
            Err(SolveFailure::Unsatisfiable)
        ));
    }

    /// .#.
    /// ...
    /// .#.
    #[test]
    fn test_solve_fills_crossing_grid() {
        let puzzle =
            Puzzle::from_template_string(".#.\n...\n.#.", &words(&["CAT", "DOG", "AGO"]));

        let solution = Solver::new(&puzzle)
            .solve()
            .expect("Failed to fill the grid");

        assert_eq!(chosen_word(&puzzle, &solution.choices, 0), "AGO");
        assert_eq!(chosen_word(&puzzle, &solution.choices, 1), "CAT");
        assert_eq!(chosen_word(&puzzle, &solution.choices, 2), "DOG");

        assert_eq!(solution.statistics.states, 4);
        assert_eq!(solution.statistics.backtracks, 0);
        assert!(solution.statistics.revisions > 0);
    }

    /// .#.
    /// ...
    /// .#.
    #[test]
    fn test_render_solution() {
        let puzzle =
            Puzzle::from_template_string(".#.\n...\n.#.", &words(&["CAT", "DOG", "AGO"]));

        assert_eq!(render_solution(&puzzle, &[]), " █ \n   \n █ ");

        let solution = Solver::new(&puzzle)
            .solve()
            .expect("Failed to fill the grid");
        assert_eq!(render_solution(&puzzle, &solution.choices), "C█D\nAGO\nT█G");
    }

    /// ..
    /// .#
    #[test]
    fn test_identical_word_never_reused() {
        let puzzle = Puzzle::from_template_string("..\n.#", &words(&["AA"]));

        // The crossing agrees with itself, but a word may only be placed once.
        assert!(matches!(
            Solver::new(&puzzle).solve(),
            Err(SolveFailure::Unsatisfiable)
        ));
    }

    /// ..
    /// .#
    #[test]
    fn test_unsatisfiable_crossing_reports_no_solution() {
        let puzzle = Puzzle::from_template_string("..\n.#", &words(&["AB", "CD"]));

        assert!(matches!(
            Solver::new(&puzzle).solve(),
            Err(SolveFailure::Unsatisfiable)
        ));
    }

    /// .#.
    /// ...
    /// .#.
    #[test]
    fn test_state_limit_aborts_search() {
        let puzzle =
            Puzzle::from_template_string(".#.\n...\n.#.", &words(&["CAT", "DOG", "AGO"]));

        assert!(matches!(
            Solver::new(&puzzle).with_state_limit(1).solve(),
            Err(SolveFailure::StateLimitExceeded)
        ));
    }

    /// ....
    /// .##.
    /// .##.
    /// ....
    #[test]
    fn test_solution_is_complete_and_consistent() {
        let puzzle = Puzzle::from_template_string(
            "....\n.##.\n.##.\n....",
            &words(&["SOUP", "SLID", "DENT", "PORT", "SAND", "TINT", "PEAT"]),
        );

        let solution = Solver::new(&puzzle)
            .solve()
            .expect("Failed to fill the grid");
        assert_eq!(solution.choices.len(), puzzle.slots().len());

        let mut by_slot = vec![0; puzzle.slots().len()];
        for choice in &solution.choices {
            by_slot[choice.slot_id] = choice.word_id;
        }

        for x in 0..puzzle.slots().len() {
            assert_eq!(
                puzzle.vocabulary()[by_slot[x]].letters.len(),
                puzzle.slots()[x].length
            );
            for y in x + 1..puzzle.slots().len() {
                assert_ne!(by_slot[x], by_slot[y]);
                if let Some((offset_x, offset_y)) = puzzle.overlap(x, y) {
                    assert_eq!(
                        puzzle.vocabulary()[by_slot[x]].letters[offset_x],
                        puzzle.vocabulary()[by_slot[y]].letters[offset_y]
                    );
                }
            }
        }
    }

    /// .#.
    /// ...
    /// .#.
    #[test]
    fn test_fresh_solver_solves_after_a_failed_attempt() {
        let puzzle =
            Puzzle::from_template_string(".#.\n...\n.#.", &words(&["CAT", "DOG", "AGO"]));

        // A budget-starved attempt consumes its solver; a fresh one starts from fresh domains.
        assert!(Solver::new(&puzzle).with_state_limit(1).solve().is_err());
        assert!(Solver::new(&puzzle).solve().is_ok());
    }
}
