mod autofix;
mod cache_tiers;
