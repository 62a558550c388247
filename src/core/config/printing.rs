use crate::core::config::defaults::EffectiveConfig;

impl EffectiveConfig {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  model: {}", self.model);
        println!("  base-url: {}", self.base_url);
        println!("  product-api-url: {}", self.product_api_url);
        println!("  episode-api-url: {}", self.episode_api_url);
        println!("  max-tool-rounds: {}", self.max_tool_rounds);
        match self.markdown {
            true => println!("  markdown: on"),
            false => println!("  markdown: off"),
        }
        match &self.api_key {
            Some(_) => println!("  api-key: (set)"),
            None => println!("  api-key: (unset)"),
        }
    }
}
