use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    program_option::COption,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    engine::{Caller, LendingEngine, NoTrades, PositionOutcome, TokenGateway},
    error::LendingError,
    instruction::LendingInstruction,
    state::{
        pack_account, unpack_account, AmountBook, AssetSelector, FeeSchedule, LendingMarket,
        MarketWiring, RiskParameterUpdate, AMOUNT_BOOK_SEED, CUSTODY_SEED, MARKET_SEED,
    },
    token_gateway::{CustodySigner, FeedRates, SplTokenGateway},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = LendingInstruction::unpack(instruction_data)?;

        match instruction {
            LendingInstruction::InitializeMarket {
                generation,
                treasury,
                exchange_program,
                predecessor,
            } => {
                msg!("Instruction: InitializeMarket");
                Self::process_initialize_market(
                    program_id,
                    accounts,
                    generation,
                    treasury,
                    exchange_program,
                    predecessor,
                )
            }
            LendingInstruction::OpenAmountBook => {
                msg!("Instruction: OpenAmountBook");
                Self::process_open_amount_book(program_id, accounts)
            }
            LendingInstruction::RegisterAsset {
                symbol,
                name,
                default_rate,
            } => {
                msg!("Instruction: RegisterAsset");
                Self::process_register_asset(program_id, accounts, symbol, name, default_rate)
            }
            LendingInstruction::SetFeeSchedule { fees } => {
                msg!("Instruction: SetFeeSchedule");
                Self::process_set_fee_schedule(program_id, accounts, fees)
            }
            LendingInstruction::UpdateRiskParameters { update } => {
                msg!("Instruction: UpdateRiskParameters");
                Self::process_update_risk_parameters(program_id, accounts, update)
            }
            LendingInstruction::AssignBank { bank } => {
                msg!("Instruction: AssignBank");
                Self::process_assign_bank(program_id, accounts, bank)
            }
            LendingInstruction::AddOperator { operator } => {
                msg!("Instruction: AddOperator");
                Self::process_add_operator(program_id, accounts, operator)
            }
            LendingInstruction::RemoveOperator { operator } => {
                msg!("Instruction: RemoveOperator");
                Self::process_remove_operator(program_id, accounts, operator)
            }
            LendingInstruction::Deposit { amount } => {
                msg!("Instruction: Deposit");
                Self::process_deposit(program_id, accounts, amount)
            }
            LendingInstruction::Borrow { asset_mint, amount } => {
                msg!("Instruction: Borrow");
                Self::process_borrow(program_id, accounts, asset_mint, amount)
            }
            LendingInstruction::Repay { asset_mint, amount } => {
                msg!("Instruction: Repay");
                Self::process_repay(program_id, accounts, asset_mint, amount)
            }
            LendingInstruction::WithdrawCollateral { amount } => {
                msg!("Instruction: WithdrawCollateral");
                Self::process_withdraw_collateral(program_id, accounts, amount)
            }
            LendingInstruction::Offset { selector } => {
                msg!("Instruction: Offset");
                Self::process_offset(program_id, accounts, selector)
            }
            LendingInstruction::TransferProfit { asset_mint, amount } => {
                msg!("Instruction: TransferProfit");
                Self::process_transfer_profit(program_id, accounts, asset_mint, amount)
            }
            LendingInstruction::BurnFundAccount { asset_mint, amount } => {
                msg!("Instruction: BurnFundAccount");
                Self::process_burn_fund_account(program_id, accounts, asset_mint, amount)
            }
            LendingInstruction::Migrate => {
                msg!("Instruction: Migrate");
                Self::process_migrate(program_id, accounts)
            }
            LendingInstruction::MigrateAmountBook => {
                msg!("Instruction: MigrateAmountBook");
                Self::process_migrate_amount_book(program_id, accounts)
            }
            LendingInstruction::ReportPosition => {
                msg!("Instruction: ReportPosition");
                Self::process_report_position(program_id, accounts)
            }
        }
    }

    fn caller(info: &AccountInfo) -> Result<Caller, ProgramError> {
        if !info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        Ok(Caller::new(*info.key))
    }

    fn load_market(program_id: &Pubkey, info: &AccountInfo) -> Result<LendingMarket, ProgramError> {
        if info.owner != program_id {
            return Err(LendingError::InvalidAccountOwner.into());
        }
        let market: LendingMarket = unpack_account(&info.try_borrow_data()?)?;
        market.validate()?;
        Ok(market)
    }

    fn load_book(program_id: &Pubkey, info: &AccountInfo) -> Result<AmountBook, ProgramError> {
        if info.owner != program_id {
            return Err(LendingError::InvalidAccountOwner.into());
        }
        let book: AmountBook = unpack_account(&info.try_borrow_data()?)?;
        book.validate()?;
        Ok(book)
    }

    fn check_token_program(info: &AccountInfo) -> ProgramResult {
        if *info.key != spl_token::id() {
            return Err(ProgramError::IncorrectProgramId);
        }
        Ok(())
    }

    fn custody_signer(market_key: &Pubkey, market: &LendingMarket) -> CustodySigner {
        CustodySigner {
            custody: market.custody,
            market: *market_key,
            bump: market.custody_bump,
        }
    }

    fn process_initialize_market(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        generation: u8,
        treasury: Pubkey,
        exchange_program: Pubkey,
        predecessor: Option<Pubkey>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;
        let custody_info = next_account_info(account_info_iter)?;
        let collateral_mint_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;
        let rent = &Rent::from_account_info(next_account_info(account_info_iter)?)?;

        let operator = Self::caller(operator_info)?;

        if collateral_mint_info.owner != &spl_token::id() {
            return Err(LendingError::MintNotFound.into());
        }

        let (market_key, market_bump) = Pubkey::find_program_address(
            &[MARKET_SEED, collateral_mint_info.key.as_ref(), &[generation]],
            program_id,
        );
        if market_key != *market_info.key {
            return Err(LendingError::InvalidPDA.into());
        }
        if market_info.owner == program_id {
            return Err(LendingError::AccountAlreadyInitialized.into());
        }

        let (custody_key, custody_bump) =
            Pubkey::find_program_address(&[CUSTODY_SEED, market_key.as_ref()], program_id);
        if custody_key != *custody_info.key {
            return Err(LendingError::InvalidPDA.into());
        }

        invoke_signed(
            &system_instruction::create_account(
                operator_info.key,
                market_info.key,
                rent.minimum_balance(LendingMarket::LEN),
                LendingMarket::LEN as u64,
                program_id,
            ),
            &[
                operator_info.clone(),
                market_info.clone(),
                system_program.clone(),
            ],
            &[&[
                MARKET_SEED,
                collateral_mint_info.key.as_ref(),
                &[generation],
                &[market_bump],
            ]],
        )?;

        let wiring = MarketWiring {
            collateral_mint: *collateral_mint_info.key,
            treasury,
            exchange_program,
        };
        let market = LendingMarket::new(
            generation,
            market_bump,
            custody_key,
            custody_bump,
            wiring,
            *operator.key(),
            predecessor,
        );
        pack_account(&market, &mut market_info.try_borrow_mut_data()?)?;

        msg!("Market {} initialized, custody {}", market_key, custody_key);
        Ok(())
    }

    fn process_open_amount_book(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;
        let book_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;
        let rent = &Rent::from_account_info(next_account_info(account_info_iter)?)?;

        let owner = Self::caller(owner_info)?;
        let market = Self::load_market(program_id, market_info)?;
        market.ensure_active()?;

        let (book_key, book_bump) = Pubkey::find_program_address(
            &[AMOUNT_BOOK_SEED, market_info.key.as_ref(), owner.key().as_ref()],
            program_id,
        );
        if book_key != *book_info.key {
            return Err(LendingError::InvalidPDA.into());
        }
        if book_info.owner == program_id {
            return Err(LendingError::AccountAlreadyInitialized.into());
        }

        invoke_signed(
            &system_instruction::create_account(
                owner_info.key,
                book_info.key,
                rent.minimum_balance(AmountBook::LEN),
                AmountBook::LEN as u64,
                program_id,
            ),
            &[owner_info.clone(), book_info.clone(), system_program.clone()],
            &[&[
                AMOUNT_BOOK_SEED,
                market_info.key.as_ref(),
                owner.key().as_ref(),
                &[book_bump],
            ]],
        )?;

        let book = AmountBook::new(*market_info.key, *owner.key(), book_bump);
        pack_account(&book, &mut book_info.try_borrow_mut_data()?)?;

        msg!("Amount book opened for {}", owner.key());
        Ok(())
    }

    fn process_register_asset(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        symbol: String,
        name: String,
        default_rate: u128,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;
        let mint_info = next_account_info(account_info_iter)?;

        let operator = Self::caller(operator_info)?;
        let mut market = Self::load_market(program_id, market_info)?;

        // Custody must be the only minter
        if mint_info.owner != &spl_token::id() {
            return Err(LendingError::MintNotFound.into());
        }
        let mint = spl_token::state::Mint::unpack(&mint_info.try_borrow_data()?)
            .map_err(|_| LendingError::MintNotFound)?;
        if mint.mint_authority != COption::Some(market.custody) {
            return Err(LendingError::InvalidMintAuthority.into());
        }

        Self::administer(market_info.key, &mut market, |engine| {
            engine
                .register_asset(&operator, symbol, name, *mint_info.key, default_rate)
                .map(|_| ())
        })?;

        pack_account(&market, &mut market_info.try_borrow_mut_data()?)
    }

    fn process_set_fee_schedule(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        fees: FeeSchedule,
    ) -> ProgramResult {
        let (operator, market_info, mut market) = Self::load_admin(program_id, accounts)?;
        Self::administer(market_info.key, &mut market, |engine| {
            engine.set_fee_schedule(&operator, fees)
        })?;
        pack_account(&market, &mut market_info.try_borrow_mut_data()?)
    }

    fn process_update_risk_parameters(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        update: RiskParameterUpdate,
    ) -> ProgramResult {
        let (operator, market_info, mut market) = Self::load_admin(program_id, accounts)?;
        Self::administer(market_info.key, &mut market, |engine| {
            engine.update_risk_parameters(&operator, update)
        })?;
        pack_account(&market, &mut market_info.try_borrow_mut_data()?)
    }

    fn process_assign_bank(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        bank: Pubkey,
    ) -> ProgramResult {
        let (operator, market_info, mut market) = Self::load_admin(program_id, accounts)?;
        Self::administer(market_info.key, &mut market, |engine| {
            engine.assign_bank(&operator, bank)
        })?;
        pack_account(&market, &mut market_info.try_borrow_mut_data()?)
    }

    fn process_add_operator(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        new_operator: Pubkey,
    ) -> ProgramResult {
        let (operator, market_info, mut market) = Self::load_admin(program_id, accounts)?;
        Self::administer(market_info.key, &mut market, |engine| {
            engine.add_operator(&operator, new_operator)
        })?;
        pack_account(&market, &mut market_info.try_borrow_mut_data()?)
    }

    fn process_remove_operator(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        removed: Pubkey,
    ) -> ProgramResult {
        let (operator, market_info, mut market) = Self::load_admin(program_id, accounts)?;
        Self::administer(market_info.key, &mut market, |engine| {
            engine.remove_operator(&operator, &removed)
        })?;
        pack_account(&market, &mut market_info.try_borrow_mut_data()?)
    }

    /// Operator signer and market, the layout shared by configuration instructions
    fn load_admin<'a, 'info>(
        program_id: &Pubkey,
        accounts: &'a [AccountInfo<'info>],
    ) -> Result<(Caller, &'a AccountInfo<'info>, LendingMarket), ProgramError> {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;

        let operator = Self::caller(operator_info)?;
        let market = Self::load_market(program_id, market_info)?;
        Ok((operator, market_info, market))
    }

    /// Run a configuration change; these never touch tokens or prices
    fn administer<F>(market_key: &Pubkey, market: &mut LendingMarket, change: F) -> ProgramResult
    where
        F: FnOnce(&mut LendingEngine<'_, NoTokens, NoTrades>) -> Result<(), LendingError>,
    {
        let mut tokens = NoTokens;
        let rates = NoTrades;
        let mut engine = LendingEngine::new(*market_key, market, &mut tokens, &rates);
        change(&mut engine)?;
        Ok(())
    }

    fn process_deposit(program_id: &Pubkey, accounts: &[AccountInfo], amount: u128) -> ProgramResult {
        Self::process_position(program_id, accounts, |engine, caller, book| {
            engine.deposit(caller, book, amount)
        })
    }

    fn process_borrow(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        asset_mint: Pubkey,
        amount: u128,
    ) -> ProgramResult {
        Self::process_position(program_id, accounts, |engine, caller, book| {
            engine.borrow(caller, book, &asset_mint, amount)
        })
    }

    fn process_repay(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        asset_mint: Pubkey,
        amount: u128,
    ) -> ProgramResult {
        Self::process_position(program_id, accounts, |engine, caller, book| {
            engine.repay(caller, book, &asset_mint, amount)
        })
    }

    fn process_withdraw_collateral(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u128,
    ) -> ProgramResult {
        Self::process_position(program_id, accounts, |engine, caller, book| {
            engine.withdraw_collateral(caller, book, amount)
        })
    }

    fn process_offset(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        selector: AssetSelector,
    ) -> ProgramResult {
        Self::process_position(program_id, accounts, |engine, caller, book| {
            let report = engine.offset(caller, book, selector)?;
            for (mint, amount) in report.repaid.iter() {
                msg!("Repaid {} of {}", amount, mint);
            }
            Ok(PositionOutcome::Applied)
        })
    }

    /// Shared flow of the book-mutating instructions
    fn process_position<'a, 'info, F>(
        program_id: &Pubkey,
        accounts: &'a [AccountInfo<'info>],
        operation: F,
    ) -> ProgramResult
    where
        F: FnOnce(
            &mut LendingEngine<'_, SplTokenGateway<'a, 'info>, FeedRates<'a, 'info>>,
            &Caller,
            &mut AmountBook,
        ) -> Result<PositionOutcome, LendingError>,
    {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;
        let book_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;
        let remaining = account_info_iter.as_slice();

        let caller = Self::caller(caller_info)?;
        Self::check_token_program(token_program)?;
        let mut market = Self::load_market(program_id, market_info)?;
        let mut book = Self::load_book(program_id, book_info)?;

        let rates = FeedRates::new(market.wiring.exchange_program, remaining);
        let mut tokens = SplTokenGateway::new(
            token_program,
            accounts,
            Self::custody_signer(market_info.key, &market),
        );

        let outcome = {
            let mut engine = LendingEngine::new(*market_info.key, &mut market, &mut tokens, &rates);
            operation(&mut engine, &caller, &mut book)?
        };

        if let PositionOutcome::Ignored(reason) = outcome {
            msg!("Request ignored: {:?}", reason);
            return Ok(());
        }

        pack_account(&market, &mut market_info.try_borrow_mut_data()?)?;
        pack_account(&book, &mut book_info.try_borrow_mut_data()?)
    }

    fn process_transfer_profit(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        asset_mint: Pubkey,
        amount: u128,
    ) -> ProgramResult {
        Self::process_revenue(program_id, accounts, |engine, operator| {
            engine.transfer_profit(operator, &asset_mint, amount)
        })
    }

    fn process_burn_fund_account(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        asset_mint: Pubkey,
        amount: u128,
    ) -> ProgramResult {
        Self::process_revenue(program_id, accounts, |engine, operator| {
            engine.burn_fund_account(operator, &asset_mint, amount)
        })
    }

    fn process_revenue<'a, 'info, F>(
        program_id: &Pubkey,
        accounts: &'a [AccountInfo<'info>],
        operation: F,
    ) -> ProgramResult
    where
        F: FnOnce(
            &mut LendingEngine<'_, SplTokenGateway<'a, 'info>, NoTrades>,
            &Caller,
        ) -> Result<(), LendingError>,
    {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        let operator = Self::caller(operator_info)?;
        Self::check_token_program(token_program)?;
        let mut market = Self::load_market(program_id, market_info)?;

        let rates = NoTrades;
        let mut tokens = SplTokenGateway::new(
            token_program,
            accounts,
            Self::custody_signer(market_info.key, &market),
        );
        {
            let mut engine = LendingEngine::new(*market_info.key, &mut market, &mut tokens, &rates);
            operation(&mut engine, &operator)?;
        }

        pack_account(&market, &mut market_info.try_borrow_mut_data()?)
    }

    fn process_migrate(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let old_market_info = next_account_info(account_info_iter)?;
        let new_market_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        let operator = Self::caller(operator_info)?;
        Self::check_token_program(token_program)?;
        let mut old_market = Self::load_market(program_id, old_market_info)?;
        let mut new_market = Self::load_market(program_id, new_market_info)?;

        let rates = NoTrades;
        let mut tokens = SplTokenGateway::new(
            token_program,
            accounts,
            Self::custody_signer(old_market_info.key, &old_market),
        );
        {
            let mut engine =
                LendingEngine::new(*old_market_info.key, &mut old_market, &mut tokens, &rates);
            engine.migrate(&operator, new_market_info.key, &mut new_market)?;
        }

        pack_account(&old_market, &mut old_market_info.try_borrow_mut_data()?)?;
        pack_account(&new_market, &mut new_market_info.try_borrow_mut_data()?)
    }

    fn process_migrate_amount_book(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let old_market_info = next_account_info(account_info_iter)?;
        let new_market_info = next_account_info(account_info_iter)?;
        let old_book_info = next_account_info(account_info_iter)?;
        let new_book_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        let caller = Self::caller(caller_info)?;
        Self::check_token_program(token_program)?;
        let mut old_market = Self::load_market(program_id, old_market_info)?;
        let new_market = Self::load_market(program_id, new_market_info)?;
        let mut old_book = Self::load_book(program_id, old_book_info)?;
        let mut new_book = Self::load_book(program_id, new_book_info)?;

        let rates = NoTrades;
        let mut tokens = SplTokenGateway::new(
            token_program,
            accounts,
            Self::custody_signer(old_market_info.key, &old_market),
        );
        {
            let mut engine =
                LendingEngine::new(*old_market_info.key, &mut old_market, &mut tokens, &rates);
            engine.migrate_amount_book(
                &caller,
                &mut old_book,
                new_market_info.key,
                &new_market,
                &mut new_book,
            )?;
        }

        pack_account(&old_book, &mut old_book_info.try_borrow_mut_data()?)?;
        pack_account(&new_book, &mut new_book_info.try_borrow_mut_data()?)
    }

    fn process_report_position(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let market_info = next_account_info(account_info_iter)?;
        let book_info = next_account_info(account_info_iter)?;
        let feeds = account_info_iter.as_slice();

        let mut market = Self::load_market(program_id, market_info)?;
        let book = Self::load_book(program_id, book_info)?;

        let rates = FeedRates::new(market.wiring.exchange_program, feeds);
        let mut tokens = NoTokens;
        let engine = LendingEngine::new(*market_info.key, &mut market, &mut tokens, &rates);
        let report = engine.position_report(&book)?;

        msg!(
            "Collateral {}, debt value {}, mortgage rate {}, usable collateral {}",
            report.collateral,
            report.total_debt_value,
            report.mortgage_rate,
            report.usable_collateral
        );
        for asset in report.assets.iter() {
            msg!(
                "{}: price {}, debt {}, remaining capacity {}",
                asset.symbol,
                asset.price,
                asset.debt,
                asset.remaining_borrow_capacity
            );
        }
        msg!(
            "Profit {}, highest mortgage rate {}, closing line {}",
            engine.profit(),
            engine.highest_mortgage_rate(),
            engine.closing_line()
        );
        Ok(())
    }
}

/// Gateway for instructions that never move tokens
struct NoTokens;

impl TokenGateway for NoTokens {
    fn balance_of(&self, _: &Pubkey, _: &Pubkey) -> Result<u128, LendingError> {
        Ok(0)
    }

    fn allowance(&self, _: &Pubkey, _: &Pubkey, _: &Pubkey) -> Result<u128, LendingError> {
        Ok(0)
    }

    fn total_supply(&self, _: &Pubkey) -> Result<u128, LendingError> {
        Ok(0)
    }

    fn transfer_from(
        &mut self,
        _: &Pubkey,
        _: &Pubkey,
        _: &Pubkey,
        _: &Pubkey,
        _: u128,
    ) -> Result<(), LendingError> {
        Err(LendingError::TokenOperationFailed)
    }

    fn transfer(&mut self, _: &Pubkey, _: &Pubkey, _: &Pubkey, _: u128) -> Result<(), LendingError> {
        Err(LendingError::TokenOperationFailed)
    }

    fn mint_to(&mut self, _: &Pubkey, _: &Pubkey, _: &Pubkey, _: u128) -> Result<(), LendingError> {
        Err(LendingError::TokenOperationFailed)
    }

    fn burn_from(&mut self, _: &Pubkey, _: &Pubkey, _: &Pubkey, _: u128) -> Result<(), LendingError> {
        Err(LendingError::TokenOperationFailed)
    }

    fn set_mint_authority(&mut self, _: &Pubkey, _: &Pubkey, _: &Pubkey) -> Result<(), LendingError> {
        Err(LendingError::TokenOperationFailed)
    }
}
