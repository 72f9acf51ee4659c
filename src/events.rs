use crate::genetic::Termination;

/// Progress notifications emitted while a plan is computed.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEvent {
    SheetPlaced {
        sheet_number: usize,
        pieces_placed: usize,
        waste_percentage: f64,
    },
    /// A fresh sheet took none of the remaining pieces; allocation stops.
    Stalled {
        sheet_number: usize,
        pieces_remaining: u32,
    },
    SheetCapReached {
        cap: usize,
        pieces_remaining: u32,
    },
    Generation {
        generation: u32,
        best_fitness: f64,
        best_waste_percentage: f64,
    },
    SearchFinished {
        generations: u32,
        termination: Termination,
        best_waste_percentage: f64,
    },
}

pub trait PlanObserver: Send + Sync {
    fn on_event(&self, event: &PlanEvent);
}

impl<F> PlanObserver for F
where
    F: Fn(&PlanEvent) + Send + Sync,
{
    fn on_event(&self, event: &PlanEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PlanObserver for NoopObserver {
    fn on_event(&self, _event: &PlanEvent) {}
}
