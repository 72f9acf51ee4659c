//! Genetic search over placement order and piece rotation.
//!
//! A chromosome is a permutation of unit-piece indices plus a rotation flag
//! per position. Each chromosome is decoded by the guillotine placer in exact
//! sequence order, and scored by the resulting sheet utilization.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::{NoopObserver, PlanEvent, PlanObserver};
use crate::guillotine::GuillotinePlacer;
use crate::pieces::UnitPiece;
use crate::settings::GeneticParams;
use crate::types::{CuttingResult, Material, RotationPolicy};

/// Below this many pieces the search is skipped and the placer runs directly.
pub const MIN_PIECES: usize = 10;

pub const TOURNAMENT_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct Chromosome {
    /// Placement order, as indices into the piece list.
    pub sequence: Vec<usize>,
    /// Rotation of the piece at the same position of `sequence`.
    pub rotations: Vec<bool>,
    pub fitness: f64,
    layout: Option<CuttingResult>,
}

impl Chromosome {
    pub fn new(sequence: Vec<usize>, rotations: Vec<bool>) -> Self {
        Self {
            sequence,
            rotations,
            fitness: 0.0,
            layout: None,
        }
    }

    /// Shuffled order with random rotations wherever the piece may turn.
    pub fn random<R: Rng>(pieces: &[UnitPiece], allow_rotation: bool, rng: &mut R) -> Self {
        let mut sequence: Vec<usize> = (0..pieces.len()).collect();
        sequence.shuffle(rng);
        let rotations = sequence
            .iter()
            .map(|&i| initial_rotation(&pieces[i], allow_rotation, rng))
            .collect();
        Self::new(sequence, rotations)
    }

    /// Largest area first, each piece in its default orientation; the order
    /// the plain placer uses.
    pub fn area_descending(pieces: &[UnitPiece]) -> Self {
        let mut sequence: Vec<usize> = (0..pieces.len()).collect();
        sequence.sort_by(|&a, &b| pieces[b].area().total_cmp(&pieces[a].area()));
        let rotations = sequence
            .iter()
            .map(|&i| pieces[i].rotation == RotationPolicy::FixedRotate)
            .collect();
        Self::new(sequence, rotations)
    }

    pub fn layout(&self) -> Option<&CuttingResult> {
        self.layout.as_ref()
    }

    pub fn is_evaluated(&self) -> bool {
        self.layout.is_some()
    }

    pub fn waste_percentage(&self) -> f64 {
        self.layout.as_ref().map_or(100.0, |l| l.waste_percentage)
    }

    fn evaluate(&mut self, placer: &GuillotinePlacer, sheet: &Material, pieces: &[UnitPiece]) {
        let genes: Vec<(&UnitPiece, bool)> = self
            .sequence
            .iter()
            .zip(&self.rotations)
            .map(|(&i, &rotated)| (&pieces[i], rotated))
            .collect();
        let layout = placer.layout_ordered(sheet, &genes);
        self.fitness = layout.utilization() * 1000.0;
        self.layout = Some(layout);
    }

    /// Order crossover: a random segment of `self` is kept in place and the
    /// other positions are filled with the remaining pieces in `other`'s
    /// order. Rotation flags travel with their pieces.
    pub fn order_crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let n = self.sequence.len();
        if n < 2 {
            return self.unevaluated_copy();
        }

        let start = rng.gen_range(0..n);
        let end = rng.gen_range(start..n);

        let mut sequence = vec![usize::MAX; n];
        let mut rotations = vec![false; n];
        let mut used = vec![false; n];
        for i in start..=end {
            sequence[i] = self.sequence[i];
            rotations[i] = self.rotations[i];
            used[self.sequence[i]] = true;
        }

        let mut j = 0;
        for i in 0..n {
            if sequence[i] != usize::MAX {
                continue;
            }
            while used[other.sequence[j]] {
                j += 1;
            }
            sequence[i] = other.sequence[j];
            rotations[i] = other.rotations[j];
            used[other.sequence[j]] = true;
            j += 1;
        }

        Self::new(sequence, rotations)
    }

    /// Swaps two positions, rotations included. Returns whether anything moved.
    pub fn swap_mutate<R: Rng>(&mut self, rng: &mut R) -> bool {
        let n = self.sequence.len();
        if n < 2 {
            return false;
        }
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        self.sequence.swap(a, b);
        self.rotations.swap(a, b);
        a != b
    }

    /// Flips the rotation at one random position if that piece may turn.
    pub fn rotation_mutate<R: Rng>(
        &mut self,
        pieces: &[UnitPiece],
        allow_rotation: bool,
        rng: &mut R,
    ) -> bool {
        if self.rotations.is_empty() {
            return false;
        }
        let pos = rng.gen_range(0..self.rotations.len());
        if pieces[self.sequence[pos]].can_flip(allow_rotation) {
            self.rotations[pos] = !self.rotations[pos];
            true
        } else {
            false
        }
    }

    fn unevaluated_copy(&self) -> Self {
        Self::new(self.sequence.clone(), self.rotations.clone())
    }
}

fn initial_rotation<R: Rng>(piece: &UnitPiece, allow_rotation: bool, rng: &mut R) -> bool {
    match piece.rotation {
        RotationPolicy::FixedDefault => false,
        RotationPolicy::FixedRotate => true,
        RotationPolicy::Auto => piece.can_flip(allow_rotation) && rng.gen_bool(0.5),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// Best waste dropped below the convergence threshold.
    Converged,
    Stagnated,
    GenerationLimit,
    TimeLimit,
}

#[derive(Debug, Clone)]
pub struct GeneticOutcome {
    pub layout: CuttingResult,
    pub generations: u32,
    pub termination: Termination,
    pub best_fitness: f64,
    /// Best-ever fitness after each generation.
    pub history: Vec<f64>,
}

pub struct GeneticOptimizer {
    placer: GuillotinePlacer,
    params: Option<GeneticParams>,
    rng: StdRng,
    observer: Arc<dyn PlanObserver>,
}

impl GeneticOptimizer {
    /// `params` of `None` picks the tier matching each sheet's piece count.
    pub fn new(placer: GuillotinePlacer, params: Option<GeneticParams>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            placer,
            params,
            rng,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PlanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Lays out one sheet, searching only when there are enough pieces for
    /// the order to matter.
    pub fn layout(&mut self, sheet: &Material, pieces: &[UnitPiece]) -> CuttingResult {
        if pieces.len() <= MIN_PIECES {
            return self.placer.layout(sheet, pieces);
        }
        self.optimize(sheet, pieces).layout
    }

    pub fn optimize(&mut self, sheet: &Material, pieces: &[UnitPiece]) -> GeneticOutcome {
        let params = self
            .params
            .clone()
            .unwrap_or_else(|| GeneticParams::for_piece_count(pieces.len()));
        let time_limit = params.time_limit_ms.map(Duration::from_millis);
        let started = Instant::now();
        let allow_rotation = self.placer.allow_rotation;

        tracing::info!(
            pieces = pieces.len(),
            population = params.population_size,
            max_generations = params.max_generations,
            "starting genetic search"
        );

        let mut population = self.initial_population(pieces, params.population_size);
        let mut best: Option<Chromosome> = None;
        let mut stagnant = 0u32;
        let mut history = Vec::new();
        let mut generation = 0u32;
        let mut termination = Termination::GenerationLimit;

        while generation < params.max_generations {
            generation += 1;

            self.evaluate(&mut population, sheet, pieces);
            let mut improved = false;
            for chromosome in &population {
                if best.as_ref().is_none_or(|b| chromosome.fitness > b.fitness) {
                    best = Some(chromosome.clone());
                    improved = true;
                }
            }
            stagnant = if improved { 0 } else { stagnant + 1 };

            let best_fitness = best.as_ref().map_or(0.0, |b| b.fitness);
            let best_waste = best.as_ref().map_or(100.0, Chromosome::waste_percentage);
            history.push(best_fitness);
            self.observer.on_event(&PlanEvent::Generation {
                generation,
                best_fitness,
                best_waste_percentage: best_waste,
            });
            if generation % 10 == 0 {
                tracing::debug!(generation, best_fitness, best_waste, "genetic progress");
            }

            if best_waste < params.convergence_threshold {
                termination = Termination::Converged;
                break;
            }
            if stagnant >= params.max_stagnant_generations {
                termination = Termination::Stagnated;
                break;
            }
            if time_limit.is_some_and(|limit| started.elapsed() >= limit) {
                termination = Termination::TimeLimit;
                break;
            }
            if generation == params.max_generations {
                break;
            }

            population = self.next_generation(population, &params, pieces, allow_rotation);
        }

        let best_waste = best.as_ref().map_or(100.0, Chromosome::waste_percentage);
        tracing::info!(
            generations = generation,
            ?termination,
            best_waste,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "genetic search finished"
        );
        self.observer.on_event(&PlanEvent::SearchFinished {
            generations: generation,
            termination,
            best_waste_percentage: best_waste,
        });

        let best_fitness = best.as_ref().map_or(0.0, |b| b.fitness);
        let layout = match best.and_then(|b| b.layout) {
            Some(layout) => layout,
            None => self.placer.layout(sheet, pieces),
        };

        GeneticOutcome {
            layout,
            generations: generation,
            termination,
            best_fitness,
            history,
        }
    }

    fn initial_population(&mut self, pieces: &[UnitPiece], size: usize) -> Vec<Chromosome> {
        let allow_rotation = self.placer.allow_rotation;
        let mut population = Vec::with_capacity(size);
        if size > 0 {
            population.push(Chromosome::area_descending(pieces));
        }
        while population.len() < size {
            population.push(Chromosome::random(pieces, allow_rotation, &mut self.rng));
        }
        population
    }

    /// Decoding is independent per chromosome, so it runs in parallel; the
    /// placer itself is deterministic.
    fn evaluate(&self, population: &mut [Chromosome], sheet: &Material, pieces: &[UnitPiece]) {
        let placer = &self.placer;
        population
            .par_iter_mut()
            .filter(|c| !c.is_evaluated())
            .for_each(|c| c.evaluate(placer, sheet, pieces));
    }

    fn next_generation(
        &mut self,
        mut population: Vec<Chromosome>,
        params: &GeneticParams,
        pieces: &[UnitPiece],
        allow_rotation: bool,
    ) -> Vec<Chromosome> {
        population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let elite = params.elite_count().min(population.len());
        let mut next: Vec<Chromosome> = population[..elite].to_vec();

        while next.len() < params.population_size {
            let first = self.tournament(&population);
            let second = self.tournament(&population);

            let mut child = if self.rng.gen_bool(params.crossover_rate) {
                population[first].order_crossover(&population[second], &mut self.rng)
            } else if self.rng.gen_bool(0.5) {
                population[first].clone()
            } else {
                population[second].clone()
            };

            let mut changed = false;
            if self.rng.gen_bool(params.mutation_rate) {
                changed |= child.swap_mutate(&mut self.rng);
            }
            if self.rng.gen_bool(params.mutation_rate) {
                changed |= child.rotation_mutate(pieces, allow_rotation, &mut self.rng);
            }
            if changed {
                child.layout = None;
            }
            next.push(child);
        }

        next
    }

    fn tournament(&mut self, population: &[Chromosome]) -> usize {
        let mut winner = self.rng.gen_range(0..population.len());
        for _ in 1..TOURNAMENT_SIZE {
            let challenger = self.rng.gen_range(0..population.len());
            if population[challenger].fitness > population[winner].fitness {
                winner = challenger;
            }
        }
        winner
    }
}
