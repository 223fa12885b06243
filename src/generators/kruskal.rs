use rand::{Rng, rngs::StdRng, seq::SliceRandom};

use crate::{
    config::Config,
    error::MazeError,
    generators::{Generator, MazeAlgorithm, StepRecord},
    maze::{Cell, CellPatch, Grid, cell_between},
};

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        UnionFind {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        // Iterative path halving, so huge grids cannot overflow the call stack
        let mut x = x;
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn unite(&mut self, x: usize, y: usize) -> bool {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x == root_y {
            return false; // Already in same set
        }

        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Greater => {
                self.parent[root_y] = root_x;
            }
            std::cmp::Ordering::Less => {
                self.parent[root_x] = root_y;
            }
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
        true
    }
}

/// Wall edge between two passage cells two steps apart
#[derive(Debug, Clone, Copy)]
struct Edge {
    cell1: (u16, u16),
    cell2: (u16, u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    /// Joining disjoint sets until every passage cell is connected
    Spanning,
    /// Knocking down leftover walls at random to add cycles
    Loops,
    Complete,
}

/// Kruskal's algorithm over the odd-coordinate cells, followed by a pass that opens each
/// remaining wall with probability `loop_probability`. Because of that second pass the maze
/// usually has more than one route between two cells.
pub struct RandomizedKruskal {
    grid: Grid,
    rng: StdRng,
    loop_probability: f64,
    sets: UnionFind,
    /// Shuffled edges not looked at yet
    edges: Vec<Edge>,
    /// Edges that still have a wall and will be revisited by the loop pass
    loop_candidates: Vec<Edge>,
    /// Number of disjoint sets left
    components: usize,
    phase: Phase,
    current: (u16, u16),
    step_count: usize,
    loops_added: usize,
    expected_steps: usize,
}

impl RandomizedKruskal {
    /// Requires odd dimensions of at least 3.
    pub fn new(width: u16, height: u16, config: &Config, rng: StdRng) -> Result<Self, MazeError> {
        Generator::Kruskal.validate_dimensions(width, height)?;
        if !(0.0..=1.0).contains(&config.loop_probability) {
            return Err(MazeError::InvalidProbability {
                name: "loop probability",
                value: config.loop_probability,
            });
        }

        Ok(RandomizedKruskal {
            grid: Grid::new(width, height, Cell::WALL),
            rng,
            loop_probability: config.loop_probability,
            sets: UnionFind::new(0),
            edges: Vec::new(),
            loop_candidates: Vec::new(),
            components: 0,
            phase: Phase::Uninitialized,
            current: (1, 1),
            step_count: 0,
            loops_added: 0,
            expected_steps: 1,
        })
    }

    /// Passage cells per row
    fn columns(&self) -> u16 {
        (self.grid.width() - 1) / 2
    }

    /// Passage cells per column
    fn rows(&self) -> u16 {
        (self.grid.height() - 1) / 2
    }

    /// Convert a passage cell coordinate to its UnionFind index
    fn set_index(&self, coord: (u16, u16)) -> usize {
        let (x, y) = coord;
        ((y - 1) / 2) as usize * self.columns() as usize + ((x - 1) / 2) as usize
    }

    /// Whether every passage cell already belongs to one set.
    pub fn spanning_complete(&self) -> bool {
        self.phase != Phase::Uninitialized && self.components == 1
    }

    /// Number of walls removed by the loop pass so far.
    pub fn loops_added(&self) -> usize {
        self.loops_added
    }

    fn move_current(&mut self, coord: (u16, u16)) {
        self.grid.set(self.current, CellPatch::new().current(false));
        self.grid.set(coord, CellPatch::new().current(true));
        self.current = coord;
    }

    fn carve(&mut self, edge: Edge) {
        let visited = CellPatch::new().wall(false).visited(true);
        self.grid.set(edge.cell1, visited);
        self.grid.set(cell_between(edge.cell1, edge.cell2), visited);
        self.grid.set(edge.cell2, visited);
    }

    fn record(&self) -> StepRecord {
        let complete = self.phase == Phase::Complete;
        StepRecord {
            complete,
            current: (!complete).then_some(self.current),
            step_count: self.step_count,
            stack_size: self.edges.len() + self.loop_candidates.len(),
        }
    }
}

impl MazeAlgorithm for RandomizedKruskal {
    fn generator(&self) -> Generator {
        Generator::Kruskal
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn initialize(&mut self) {
        let (width, height) = (self.grid.width(), self.grid.height());
        self.grid.fill(Cell::WALL);

        let cells = (1..height)
            .step_by(2)
            .flat_map(|y| (1..width).step_by(2).map(move |x| (x, y)))
            .collect::<Vec<_>>();
        for &coord in &cells {
            self.grid.set(coord, CellPatch::new().wall(false));
        }

        // Collect all possible edges (walls between passage cells)
        let mut edges: Vec<Edge> = cells
            .iter()
            .flat_map(|&(x, y)| {
                [
                    (x + 2 < width - 1).then(|| Edge {
                        cell1: (x, y),
                        cell2: (x + 2, y),
                    }),
                    (y + 2 < height - 1).then(|| Edge {
                        cell1: (x, y),
                        cell2: (x, y + 2),
                    }),
                ]
            })
            .flatten()
            .collect();
        edges.shuffle(&mut self.rng);

        self.sets = UnionFind::new(cells.len());
        self.components = cells.len();
        // Upper bound until the spanning pass ends: every edge examined by the spanning
        // pass, every rejected one again by the loop pass, plus the completion step
        self.expected_steps = 2 * edges.len() - (cells.len() - 1).min(edges.len()) + 1;
        self.edges = edges;
        self.loop_candidates.clear();
        self.loops_added = 0;
        self.step_count = 0;

        self.current = (1, 1);
        self.grid.set(self.current, CellPatch::new().current(true));
        self.phase = Phase::Spanning;
        tracing::debug!(
            cells = cells.len(),
            edges = self.edges.len(),
            "initialized randomized kruskal"
        );
    }

    fn step(&mut self) -> StepRecord {
        match self.phase {
            Phase::Uninitialized => self.initialize(),
            Phase::Complete => return self.record(),
            Phase::Spanning | Phase::Loops => {}
        }
        self.step_count += 1;

        // Each step looks at one edge; phase changes fall through to the next phase's work
        loop {
            match self.phase {
                Phase::Spanning => {
                    let next = if self.components > 1 {
                        self.edges.pop()
                    } else {
                        None
                    };
                    let Some(edge) = next else {
                        // All cells are connected, what is left can only add loops
                        self.loop_candidates.append(&mut self.edges);
                        self.phase = Phase::Loops;
                        // This step takes the first candidate, the last step completes
                        self.expected_steps = self.step_count + self.loop_candidates.len();
                        tracing::debug!(
                            candidates = self.loop_candidates.len(),
                            "spanning tree complete, adding loops"
                        );
                        continue;
                    };

                    self.move_current(edge.cell1);
                    let idx1 = self.set_index(edge.cell1);
                    let idx2 = self.set_index(edge.cell2);
                    // If cells are not yet connected, remove the wall between them
                    if self.sets.unite(idx1, idx2) {
                        self.carve(edge);
                        self.components -= 1;
                    } else {
                        self.loop_candidates.push(edge);
                    }
                    break;
                }
                Phase::Loops => {
                    let Some(edge) = self.loop_candidates.pop() else {
                        self.grid.set(self.current, CellPatch::new().current(false));
                        self.phase = Phase::Complete;
                        tracing::debug!(
                            steps = self.step_count,
                            loops = self.loops_added,
                            "randomized kruskal complete"
                        );
                        break;
                    };

                    self.move_current(edge.cell1);
                    if self.rng.random_bool(self.loop_probability) {
                        self.carve(edge);
                        self.loops_added += 1;
                    }
                    break;
                }
                Phase::Uninitialized | Phase::Complete => break,
            }
        }

        self.record()
    }

    fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    fn step_count(&self) -> usize {
        self.step_count
    }

    fn expected_steps(&self) -> usize {
        self.expected_steps
    }

    fn cells_processed(&self) -> usize {
        self.rows() as usize * self.columns() as usize
    }

    fn start(&self) -> (u16, u16) {
        (1, 1)
    }
}
