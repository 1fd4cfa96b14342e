use crate::generator::Generator;
use crate::providers::OpenRouter;
use crate::settings::Settings;

pub struct ServerState {
    pub settings: Settings,
    pub generator: Generator<OpenRouter>,
}
