//! Bidirectional swap form calculation
//!
//! The form has an input field and an output field. Whichever the user last
//! typed into is the driving side; the other is derived from it through the
//! current exchange rate. Token pair switches, rate updates and rate loss all
//! arrive as events, and each event is applied with
//! [`CalculationState::transition`], which returns the next state plus the
//! effects the caller should observe. The current state is never mutated
//! in place, so a rejected event leaves it untouched.

use coin_core::{
    format_raw_amount, is_valid_numeric_input, ExchangeRate, TokenPair, UiAmount, ValidationError,
};
use serde::{Deserialize, Serialize};

/// Which field drives the other
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationSource {
    Input,
    Output,
    #[default]
    None,
}

/// Amounts captured when the token pair changes, replayed once a rate for
/// the new pair arrives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedAmounts {
    pub input: Option<UiAmount>,
    pub output: Option<UiAmount>,
    pub source: CalculationSource,
}

impl PreservedAmounts {
    /// Re-express both amounts at the new pair's precision
    fn rescaled(self, pair: &TokenPair) -> Self {
        Self {
            input: self.input.and_then(|a| a.rescale(pair.input.decimals).ok()),
            output: self.output.and_then(|a| a.rescale(pair.output.decimals).ok()),
            source: self.source,
        }
    }

    fn is_replayable(&self) -> bool {
        match self.source {
            CalculationSource::Input => self.input.is_some(),
            CalculationSource::Output => self.output.is_some(),
            CalculationSource::None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalcEvent {
    SetInputAmount(String),
    SetOutputAmount(String),
    SetPair(TokenPair),
    SetRate(Option<ExchangeRate>),
    BeginUpdate,
    EndUpdate,
    Reset,
}

/// Observable consequences of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalcEffect {
    OutputDerived(String),
    InputDerived(String),
    OutputCleared,
    InputCleared,
    RateDropped,
    ReplayQueued(PreservedAmounts),
    /// A newer pair change superseded a replay that was never applied
    ReplayReplaced,
    ReplayApplied(PreservedAmounts),
    /// User input arrived before the replay could be applied
    ReplayDiscarded,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: CalculationState,
    pub effects: Vec<CalcEffect>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationState {
    pair: Option<TokenPair>,
    input_amount: String,
    output_amount: String,
    source: CalculationSource,
    rate: Option<ExchangeRate>,
    pending_replay: Option<PreservedAmounts>,
    update_depth: u32,
}

impl CalculationState {
    pub fn pair(&self) -> Option<&TokenPair> {
        self.pair.as_ref()
    }

    pub fn input_amount(&self) -> &str {
        &self.input_amount
    }

    pub fn output_amount(&self) -> &str {
        &self.output_amount
    }

    pub fn source(&self) -> CalculationSource {
        self.source
    }

    pub fn rate(&self) -> Option<&ExchangeRate> {
        self.rate.as_ref()
    }

    pub fn pending_replay(&self) -> Option<&PreservedAmounts> {
        self.pending_replay.as_ref()
    }

    pub fn is_updating(&self) -> bool {
        self.update_depth > 0
    }

    /// Apply one event, returning the next state and its effects
    pub fn transition(&self, event: CalcEvent) -> Result<Transition, ValidationError> {
        let mut next = self.clone();
        let mut effects = Vec::new();

        match event {
            CalcEvent::SetInputAmount(text) => next.apply_input(text, &mut effects)?,
            CalcEvent::SetOutputAmount(text) => next.apply_output(text, &mut effects)?,
            CalcEvent::SetPair(pair) => next.apply_pair(pair, &mut effects),
            CalcEvent::SetRate(rate) => next.apply_rate(rate, &mut effects)?,
            CalcEvent::BeginUpdate => next.update_depth += 1,
            CalcEvent::EndUpdate => {
                if next.update_depth > 0 {
                    next.update_depth -= 1;
                    if next.update_depth == 0 {
                        next.derive_from_source(&mut effects)?;
                    }
                }
            }
            CalcEvent::Reset => next.apply_reset(&mut effects),
        }

        Ok(Transition {
            state: next,
            effects,
        })
    }

    fn positive_rate(&self) -> Option<&ExchangeRate> {
        self.rate.as_ref().filter(|r| r.is_positive())
    }

    fn decimals(&self, side: &'static str) -> Result<(u8, u8), ValidationError> {
        self.pair
            .as_ref()
            .map(|p| (p.input.decimals, p.output.decimals))
            .ok_or(ValidationError::MissingDecimals { side })
    }

    fn discard_replay(&mut self, effects: &mut Vec<CalcEffect>) {
        if self.pending_replay.take().is_some() {
            effects.push(CalcEffect::ReplayDiscarded);
        }
    }

    fn clear_output(&mut self, effects: &mut Vec<CalcEffect>) {
        if !self.output_amount.is_empty() {
            self.output_amount.clear();
            effects.push(CalcEffect::OutputCleared);
        }
    }

    fn clear_input(&mut self, effects: &mut Vec<CalcEffect>) {
        if !self.input_amount.is_empty() {
            self.input_amount.clear();
            effects.push(CalcEffect::InputCleared);
        }
    }

    fn apply_input(&mut self, text: String, effects: &mut Vec<CalcEffect>) -> Result<(), ValidationError> {
        let (input_decimals, _) = self.decimals("input")?;
        if !is_valid_numeric_input(&text) {
            return Err(ValidationError::MalformedAmount { input: text });
        }
        UiAmount::parse(&text, input_decimals)?;

        self.discard_replay(effects);
        self.input_amount = text;
        self.source = CalculationSource::Input;
        self.derive_output(effects)
    }

    fn apply_output(&mut self, text: String, effects: &mut Vec<CalcEffect>) -> Result<(), ValidationError> {
        let (_, output_decimals) = self.decimals("output")?;
        if !is_valid_numeric_input(&text) {
            return Err(ValidationError::MalformedAmount { input: text });
        }
        UiAmount::parse(&text, output_decimals)?;

        self.discard_replay(effects);
        self.output_amount = text;
        self.source = CalculationSource::Output;
        self.derive_input(effects)
    }

    /// Snapshot the current fields at the current pair's precision
    fn capture(&self) -> PreservedAmounts {
        let (input, output) = match &self.pair {
            Some(pair) => (
                UiAmount::parse(&self.input_amount, pair.input.decimals).ok().flatten(),
                UiAmount::parse(&self.output_amount, pair.output.decimals).ok().flatten(),
            ),
            None => (None, None),
        };
        PreservedAmounts {
            input,
            output,
            source: self.source,
        }
    }

    fn apply_pair(&mut self, pair: TokenPair, effects: &mut Vec<CalcEffect>) {
        let previous = match self.pair.take() {
            Some(previous) if previous.key() != pair.key() => previous,
            _ => {
                self.pair = Some(pair);
                return;
            }
        };

        let preserved = match self.pending_replay.take() {
            Some(pending) => {
                effects.push(CalcEffect::ReplayReplaced);
                pending
            }
            None => {
                self.pair = Some(previous.clone());
                self.capture()
            }
        };
        let preserved = preserved.rescaled(&pair);
        let input_token_changed = previous.input.token_id != pair.input.token_id;

        tracing::debug!("Token pair changed {} -> {}", previous.key(), pair.key());
        self.pair = Some(pair);

        if self.rate.take().is_some() {
            effects.push(CalcEffect::RateDropped);
        }
        self.clear_output(effects);

        match preserved.source {
            CalculationSource::Output => self.clear_input(effects),
            CalculationSource::Input if input_token_changed => {
                if let Some(amount) = preserved.input {
                    self.input_amount = amount.to_display();
                }
            }
            _ => {}
        }

        if preserved.is_replayable() {
            self.source = preserved.source;
            effects.push(CalcEffect::ReplayQueued(preserved.clone()));
            self.pending_replay = Some(preserved);
        }
    }

    fn apply_rate(
        &mut self,
        rate: Option<ExchangeRate>,
        effects: &mut Vec<CalcEffect>,
    ) -> Result<(), ValidationError> {
        match rate.filter(ExchangeRate::is_positive) {
            Some(rate) => {
                self.rate = Some(rate);
                if let Some(replay) = self.pending_replay.take() {
                    self.apply_replay(&replay);
                    effects.push(CalcEffect::ReplayApplied(replay));
                }
                if self.update_depth == 0 {
                    self.derive_from_source(effects)?;
                }
            }
            None => {
                if self.rate.take().is_some() {
                    effects.push(CalcEffect::RateDropped);
                }
                if self.source == CalculationSource::Input {
                    self.clear_output(effects);
                }
            }
        }
        Ok(())
    }

    fn apply_replay(&mut self, replay: &PreservedAmounts) {
        self.source = replay.source;
        match replay.source {
            CalculationSource::Input => {
                if let Some(amount) = replay.input {
                    self.input_amount = amount.to_display();
                    self.output_amount.clear();
                }
            }
            CalculationSource::Output => {
                if let Some(amount) = replay.output {
                    self.output_amount = amount.to_display();
                    self.input_amount.clear();
                }
            }
            CalculationSource::None => {}
        }
    }

    fn apply_reset(&mut self, effects: &mut Vec<CalcEffect>) {
        self.discard_replay(effects);
        self.clear_input(effects);
        self.clear_output(effects);
        self.source = CalculationSource::None;
    }

    fn derive_from_source(&mut self, effects: &mut Vec<CalcEffect>) -> Result<(), ValidationError> {
        match self.source {
            CalculationSource::Input => self.derive_output(effects),
            CalculationSource::Output => self.derive_input(effects),
            CalculationSource::None => Ok(()),
        }
    }

    fn derive_output(&mut self, effects: &mut Vec<CalcEffect>) -> Result<(), ValidationError> {
        let (input_decimals, output_decimals) = self.decimals("output")?;
        let input = UiAmount::parse(&self.input_amount, input_decimals)?;

        let derived = match (input, self.positive_rate()) {
            (Some(amount), Some(rate)) => {
                let raw = rate.convert(amount.raw, input_decimals, output_decimals)?;
                Some(format_raw_amount(raw, output_decimals))
            }
            _ => None,
        };

        match derived {
            Some(text) => {
                self.output_amount = text.clone();
                effects.push(CalcEffect::OutputDerived(text));
            }
            None => self.clear_output(effects),
        }
        Ok(())
    }

    fn derive_input(&mut self, effects: &mut Vec<CalcEffect>) -> Result<(), ValidationError> {
        let (input_decimals, output_decimals) = self.decimals("input")?;
        let output = UiAmount::parse(&self.output_amount, output_decimals)?;

        let derived = match (output, self.positive_rate()) {
            (Some(amount), Some(rate)) => {
                let raw = rate.convert_inverse(amount.raw, input_decimals, output_decimals)?;
                Some(format_raw_amount(raw, input_decimals))
            }
            _ => None,
        };

        match derived {
            Some(text) => {
                self.input_amount = text.clone();
                effects.push(CalcEffect::InputDerived(text));
            }
            None => self.clear_input(effects),
        }
        Ok(())
    }
}

/// Owner of a [`CalculationState`], committing one transition at a time
#[derive(Debug, Clone, Default)]
pub struct SwapCalculator {
    state: CalculationState,
}

impl SwapCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            state: CalculationState {
                pair: Some(pair),
                ..CalculationState::default()
            },
        }
    }

    pub fn state(&self) -> &CalculationState {
        &self.state
    }

    pub fn input_amount(&self) -> &str {
        self.state.input_amount()
    }

    pub fn output_amount(&self) -> &str {
        self.state.output_amount()
    }

    pub fn source(&self) -> CalculationSource {
        self.state.source()
    }

    pub fn pending_replay(&self) -> Option<&PreservedAmounts> {
        self.state.pending_replay()
    }

    /// Commit `event`; on error the state is unchanged
    pub fn apply(&mut self, event: CalcEvent) -> Result<Vec<CalcEffect>, ValidationError> {
        let Transition { state, effects } = self.state.transition(event)?;
        self.state = state;
        if !effects.is_empty() {
            tracing::debug!("Swap calculation effects: {:?}", effects);
        }
        Ok(effects)
    }

    pub fn set_input_amount(&mut self, text: &str) -> Result<Vec<CalcEffect>, ValidationError> {
        self.apply(CalcEvent::SetInputAmount(text.to_string()))
    }

    pub fn set_output_amount(&mut self, text: &str) -> Result<Vec<CalcEffect>, ValidationError> {
        self.apply(CalcEvent::SetOutputAmount(text.to_string()))
    }

    pub fn set_pair(&mut self, pair: TokenPair) -> Result<Vec<CalcEffect>, ValidationError> {
        self.apply(CalcEvent::SetPair(pair))
    }

    pub fn set_rate(&mut self, rate: Option<ExchangeRate>) -> Result<Vec<CalcEffect>, ValidationError> {
        self.apply(CalcEvent::SetRate(rate))
    }

    pub fn begin_update(&mut self) -> Result<Vec<CalcEffect>, ValidationError> {
        self.apply(CalcEvent::BeginUpdate)
    }

    pub fn end_update(&mut self) -> Result<Vec<CalcEffect>, ValidationError> {
        self.apply(CalcEvent::EndUpdate)
    }

    pub fn reset(&mut self) -> Result<Vec<CalcEffect>, ValidationError> {
        self.apply(CalcEvent::Reset)
    }
}

/// Result of a one-shot calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapComputation {
    pub input_amount: String,
    pub output_amount: String,
    pub source: CalculationSource,
}

/// Derive the output amount for `input_text` on `pair` at `rate`
pub fn compute_swap(
    input_text: &str,
    pair: &TokenPair,
    rate: Option<ExchangeRate>,
) -> Result<SwapComputation, ValidationError> {
    let mut calculator = SwapCalculator::with_pair(pair.clone());
    calculator.set_rate(rate)?;
    calculator.set_input_amount(input_text)?;
    Ok(SwapComputation {
        input_amount: calculator.input_amount().to_string(),
        output_amount: calculator.output_amount().to_string(),
        source: calculator.source(),
    })
}
