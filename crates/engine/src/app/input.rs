#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    Jump,
    ToggleRun,
    Quit,
}

const ACTION_COUNT: usize = 7;

/// Actions that count as "a direction is pressed" for the controller.
pub const DIRECTION_ACTIONS: [InputAction; 4] = [
    InputAction::MoveForward,
    InputAction::MoveLeft,
    InputAction::MoveBackward,
    InputAction::MoveRight,
];

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn any_down(&self, actions: &[InputAction]) -> bool {
        actions.iter().any(|action| self.is_down(*action))
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveForward => 0,
            InputAction::MoveBackward => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Jump => 4,
            InputAction::ToggleRun => 5,
            InputAction::Quit => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_down_only_checks_requested_actions() {
        let mut states = ActionStates::default();
        states.set(InputAction::Jump, true);
        assert!(!states.any_down(&DIRECTION_ACTIONS));

        states.set(InputAction::MoveLeft, true);
        assert!(states.any_down(&DIRECTION_ACTIONS));
    }
}
