use state_machines::state_machine;

state_machine! {
    name: GenerationMachine,
    state: GenerationState,
    initial: Idle,
    states: [Idle, Submitted, Polling, Done, Failed],
    events {
        submit { transition: { from: Idle, to: Submitted } }
        start_polling { transition: { from: Submitted, to: Polling } }
        complete { transition: { from: Polling, to: Done } }
        abort {
            transition: { from: Idle, to: Failed }
            transition: { from: Submitted, to: Failed }
            transition: { from: Polling, to: Failed }
        }
    }
}

pub fn idle() -> GenerationMachine<(), Idle> {
    GenerationMachine::new(())
}
