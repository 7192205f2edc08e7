// Lottery check: personal number in, win/lose verdict out, with an offer
// to check another number. "Yes" is a step back to the number prompt.

use anyhow::Result;

use crate::flows::{FlowContext, PERSONAL_NUMBER_LEN};
use crate::wizard::{Outcome, StepData, StepFn, Wizard};

pub fn wizard<'a>() -> Wizard<FlowContext<'a>> {
    let steps: Vec<StepFn<FlowContext<'a>>> = vec![
        ask_personal_number as StepFn<FlowContext<'a>>,
        show_result as StepFn<FlowContext<'a>>,
    ];
    Wizard::new(steps)
}

pub fn run(ctx: &mut FlowContext) -> Result<()> {
    wizard().run(ctx)
}

fn ask_personal_number(ctx: &mut FlowContext, _input: &StepData) -> Result<Outcome> {
    let number = match ctx.prompt.digits(
        "Enter your personal number",
        PERSONAL_NUMBER_LEN,
        "The personal number must be 11 digits",
    )? {
        Some(number) => number,
        None => return Ok(Outcome::Abort),
    };
    Ok(Outcome::Forward(
        StepData::new().set("personal_number", &number)?,
    ))
}

fn show_result(ctx: &mut FlowContext, input: &StepData) -> Result<Outcome> {
    let personal_number: String = input.get("personal_number")?;

    ctx.present.working("Checking the lottery result...");
    let won = ctx.api.lotto_winning(&personal_number)?;
    ctx.present.done();
    ctx.present.lotto_outcome(won);

    if ctx.prompt.confirm("Check another number?", false)? {
        Ok(Outcome::Back)
    } else {
        Ok(Outcome::Forward(StepData::new()))
    }
}
